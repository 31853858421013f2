//! Stage 3: OpenGraph and Twitter-card `<meta>` tags.

use std::sync::LazyLock;

use prodex_core::ProductRecord;
use scraper::{Html, Selector};

use crate::normalize::{availability_from_uri, parse_price_text, trimmed};

static META_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("valid meta selector"));

const TITLE_KEYS: &[&str] = &["og:title", "twitter:title"];
const DESCRIPTION_KEYS: &[&str] = &["og:description", "twitter:description"];
const IMAGE_KEYS: &[&str] = &["og:image", "twitter:image"];
const PRICE_KEYS: &[&str] = &["product:price:amount", "og:price:amount"];
const AVAILABILITY_KEYS: &[&str] = &["product:availability", "og:availability"];

/// Reads the product fields published as meta tags.
///
/// Each field is resolved on its own: the first alias with non-empty
/// `content` wins, so a page may supply the title through OpenGraph and
/// nothing else. A price of zero is treated as absent.
#[must_use]
pub fn parse_meta(document: &Html) -> ProductRecord {
    let price = lookup(document, PRICE_KEYS)
        .and_then(|raw| parse_price_text(&raw))
        .filter(|p| !p.is_zero());

    ProductRecord {
        name: lookup(document, TITLE_KEYS),
        description: lookup(document, DESCRIPTION_KEYS),
        images: lookup(document, IMAGE_KEYS).into_iter().collect(),
        price,
        availability: lookup(document, AVAILABILITY_KEYS)
            .as_deref()
            .and_then(availability_from_uri),
    }
}

/// Returns the trimmed `content` of the first meta tag matching one of
/// `keys`, trying each key against `property` before `name`.
pub(crate) fn lookup(document: &Html, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        ["property", "name"].iter().find_map(|attr| {
            document
                .select(&META_SEL)
                .filter(|meta| meta.value().attr(attr) == Some(*key))
                .find_map(|meta| meta.value().attr("content").and_then(trimmed))
        })
    })
}
