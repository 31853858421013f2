//! Field enumeration for `/debug/fields`: what a page exposes in linked
//! data, microdata (`itemprop`), and meta tags.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;

use crate::normalize::clean_text;
use crate::structured::{linked_data_items, parse_block};

/// Values shown per itemprop name before the list is cut off.
pub const ITEMPROP_SAMPLE: usize = 3;

static LINKED_DATA_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid linked-data selector")
});
static ITEMPROP_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemprop]").expect("valid itemprop selector"));
static META_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("valid meta selector"));

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldReport {
    pub linked_data: Vec<LinkedDataKeys>,
    pub itemprops: Vec<ItempropValues>,
    pub meta: Vec<MetaTag>,
}

/// Top-level keys of one linked-data item. `index` counts items across all
/// blocks on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedDataKeys {
    pub index: usize,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItempropValues {
    pub name: String,
    /// First [`ITEMPROP_SAMPLE`] values in document order.
    pub values: Vec<String>,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaTag {
    pub key: String,
    pub content: String,
}

/// Enumerates the fields of `html` and logs each entry at `info`.
#[must_use]
pub fn describe_fields(html: &str) -> FieldReport {
    let document = Html::parse_document(html);
    let report = FieldReport {
        linked_data: linked_data_keys(&document),
        itemprops: itemprop_values(&document),
        meta: meta_tags(&document),
    };
    log_report(&report);
    report
}

fn linked_data_keys(document: &Html) -> Vec<LinkedDataKeys> {
    document
        .select(&LINKED_DATA_SEL)
        .filter_map(|script| parse_block(script, "linked-data"))
        .flat_map(|value| {
            linked_data_items(&value)
                .filter_map(Value::as_object)
                .map(|obj| obj.keys().cloned().collect::<Vec<_>>())
                .collect::<Vec<_>>()
        })
        .enumerate()
        .map(|(index, keys)| LinkedDataKeys { index, keys })
        .collect()
}

fn itemprop_values(document: &Html) -> Vec<ItempropValues> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for el in document.select(&ITEMPROP_SEL) {
        let Some(name) = el.value().attr("itemprop") else {
            continue;
        };
        let value = el
            .value()
            .attr("content")
            .map_or_else(|| clean_text(&el.text().collect::<String>()), str::to_owned);

        match groups.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => values.push(value),
            None => groups.push((name.to_owned(), vec![value])),
        }
    }

    groups
        .into_iter()
        .map(|(name, mut values)| {
            let truncated = values.len() > ITEMPROP_SAMPLE;
            values.truncate(ITEMPROP_SAMPLE);
            ItempropValues {
                name,
                values,
                truncated,
            }
        })
        .collect()
}

fn meta_tags(document: &Html) -> Vec<MetaTag> {
    document
        .select(&META_SEL)
        .filter_map(|meta| {
            let attrs = meta.value();
            let key = attrs.attr("property").or_else(|| attrs.attr("name"))?;
            let content = attrs.attr("content").filter(|c| !c.is_empty())?;
            Some(MetaTag {
                key: key.to_owned(),
                content: content.to_owned(),
            })
        })
        .collect()
}

fn log_report(report: &FieldReport) {
    for item in &report.linked_data {
        tracing::info!(index = item.index, keys = ?item.keys, "linked-data item");
    }
    for prop in &report.itemprops {
        tracing::info!(
            itemprop = %prop.name,
            values = ?prop.values,
            truncated = prop.truncated,
            "itemprop"
        );
    }
    for tag in &report.meta {
        tracing::info!(key = %tag.key, content = %tag.content, "meta tag");
    }
}
