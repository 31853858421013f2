//! Stage 2: machine-readable payloads embedded in the page.
//!
//! Shapes are tried in a fixed order (linked data, platform product JSON,
//! generic JSON) and the first product found wins. A block whose text is not
//! valid JSON, or whose JSON does not match the expected shape, is skipped
//! and the scan continues with the next block.

use std::sync::LazyLock;

use prodex_core::ProductRecord;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::payload::{LinkedDataProduct, PlatformProduct, ProductPayload};

static LINKED_DATA_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid linked-data selector")
});

static PLATFORM_JSON_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[id*="ProductJson-"]"#).expect("valid platform selector")
});

static GENERIC_JSON_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/json"]"#).expect("valid generic json selector")
});

/// Finds the first product payload in `document` and converts it to a record.
#[must_use]
pub fn parse_structured(document: &Html) -> Option<ProductRecord> {
    find_payload(document).map(ProductPayload::into_record)
}

/// Finds the first product payload in `document`, trying linked data, then
/// platform product JSON, then generic JSON.
#[must_use]
pub fn find_payload(document: &Html) -> Option<ProductPayload> {
    find_linked_data(document)
        .map(ProductPayload::LinkedData)
        .or_else(|| find_platform_json(document).map(ProductPayload::PlatformJson))
        .or_else(|| find_generic_json(document).map(ProductPayload::GenericJson))
}

fn find_linked_data(document: &Html) -> Option<LinkedDataProduct> {
    document
        .select(&LINKED_DATA_SEL)
        .filter_map(|script| parse_block(script, "linked-data"))
        .find_map(|value| linked_data_items(&value).find_map(LinkedDataProduct::from_item))
}

fn find_platform_json(document: &Html) -> Option<PlatformProduct> {
    document
        .select(&PLATFORM_JSON_SEL)
        .filter_map(|script| parse_block(script, "platform product"))
        .find_map(|value| match serde_json::from_value::<PlatformProduct>(value) {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::debug!(error = %e, "skipping platform product JSON with unexpected shape");
                None
            }
        })
}

fn find_generic_json(document: &Html) -> Option<PlatformProduct> {
    document
        .select(&GENERIC_JSON_SEL)
        .filter_map(|script| parse_block(script, "generic"))
        .find_map(PlatformProduct::from_generic)
}

/// Expands one linked-data document into its candidate items: the members of
/// an `@graph` wrapper, the elements of a bare array, or the object itself.
pub(crate) fn linked_data_items(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    if let Some(graph) = value.get("@graph").and_then(Value::as_array) {
        return Box::new(graph.iter());
    }
    match value {
        Value::Array(items) => Box::new(items.iter()),
        other => Box::new(std::iter::once(other)),
    }
}

/// Parses a script element's text as JSON. Empty and malformed blocks yield
/// `None`.
pub(crate) fn parse_block(script: ElementRef<'_>, label: &str) -> Option<Value> {
    let text: String = script.text().collect();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(block = label, error = %e, "skipping malformed JSON block");
            None
        }
    }
}

#[cfg(test)]
#[path = "structured_test.rs"]
mod tests;
