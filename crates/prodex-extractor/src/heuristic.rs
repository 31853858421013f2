//! Stage 4: free-text pattern matching over the page's visible text.

use std::ops::Range;
use std::sync::LazyLock;

use prodex_core::{Availability, ProductRecord};
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};

use crate::normalize::{clean_text, non_empty, normalize_digits, parse_price_text};

/// A number immediately followed by a riyal word or abbreviation, `SAR`, or `$`.
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9][0-9,]*(?:\.[0-9]+)?)\s*(?:ريال|ر\.س|SAR|\$)").expect("valid price regex")
});

static IN_STOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:متوفر|in stock|available)\b").expect("valid in-stock regex")
});

static OUT_OF_STOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:غير متوفر|نفد|out of stock)\b").expect("valid out-of-stock regex")
});

static H1_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("valid h1 selector"));

static PRODUCT_TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h2.product-title__title").expect("valid product title selector")
});

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));

/// Elements whose text never renders.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Runs the heuristic stage. Returns `None` unless a price or an
/// availability phrase is found; the name and the meta images are then
/// filled in best-effort.
#[must_use]
pub fn parse_heuristic(document: &Html, meta_images: &[String]) -> Option<ProductRecord> {
    let text = visible_text(document);
    let price = extract_price(&text);
    let availability = extract_availability(&text);
    if price.is_none() && availability.is_none() {
        return None;
    }

    Some(ProductRecord {
        name: extract_name(document),
        description: None,
        images: meta_images.to_vec(),
        price,
        availability,
    })
}

/// First number followed by a currency marker, with thousands separators
/// stripped. Arabic-Indic digits are accepted.
#[must_use]
pub fn extract_price(text: &str) -> Option<Decimal> {
    let text = normalize_digits(text);
    PRICE_RE
        .captures_iter(&text)
        .find_map(|caps| parse_price_text(&caps[1]))
}

/// Classifies stock phrases in `text`. In-stock phrases win, but only
/// those outside an out-of-stock phrase: the `متوفر` inside `غير متوفر`
/// does not count, whatever punctuation surrounds it.
#[must_use]
pub fn extract_availability(text: &str) -> Option<Availability> {
    let out_of_stock: Vec<Range<usize>> =
        OUT_OF_STOCK_RE.find_iter(text).map(|m| m.range()).collect();
    let in_stock = IN_STOCK_RE.find_iter(text).any(|m| {
        !out_of_stock
            .iter()
            .any(|span| span.start <= m.start() && m.end() <= span.end)
    });

    if in_stock {
        Some(Availability::InStock)
    } else if out_of_stock.is_empty() {
        None
    } else {
        Some(Availability::OutOfStock)
    }
}

/// First `<h1>`, else `h2.product-title__title`, else `<title>`.
#[must_use]
pub fn extract_name(document: &Html) -> Option<String> {
    [&*H1_SEL, &*PRODUCT_TITLE_SEL, &*TITLE_SEL]
        .into_iter()
        .find_map(|sel| {
            document
                .select(sel)
                .next()
                .and_then(|el| non_empty(&el.text().collect::<String>()))
        })
}

/// Page text with script, style and template content removed, whitespace
/// collapsed.
#[must_use]
pub fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    clean_text(&out)
}

#[cfg(test)]
#[path = "heuristic_test.rs"]
mod tests;
