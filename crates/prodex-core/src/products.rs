use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stock state of a product as reported by the page.
///
/// Structured payloads use schema.org vocabulary (`https://schema.org/InStock`);
/// meta tags and free text use looser spellings. Everything that is neither
/// clearly in stock nor clearly out of stock collapses to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    InStock,
    OutOfStock,
    Unknown,
}

impl Availability {
    /// Maps a bare availability token (the trailing segment of a schema.org
    /// URI, or a meta-tag value) onto the three-state enum.
    ///
    /// Matching ignores ASCII case, spaces, underscores and hyphens, so
    /// `"InStock"`, `"in stock"`, `"in_stock"` and `"instock"` all agree.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        let folded: String = token
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match folded.as_str() {
            "instock" | "limitedavailability" | "instoreonly" | "onlineonly" | "available" => {
                Self::InStock
            }
            "outofstock" | "soldout" | "discontinued" | "oos" | "unavailable" => Self::OutOfStock,
            _ => Self::Unknown,
        }
    }

    /// `true` for `InStock` and `OutOfStock`.
    #[must_use]
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl From<bool> for Availability {
    fn from(available: bool) -> Self {
        if available {
            Self::InStock
        } else {
            Self::OutOfStock
        }
    }
}

/// A product recovered from a single page.
///
/// Every field is optional: `None` means the cascade could not determine the
/// value, which is distinct from an empty string. Records are built fresh
/// for each request and handed to the caller by value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Image URLs in page order.
    #[serde(default)]
    pub images: Vec<String>,
    /// Non-negative price, serialized as a JSON number.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub availability: Option<Availability>,
}

impl ProductRecord {
    /// Returns `true` when the record carries a name, a price, or a known
    /// availability. This is the cascade's termination test.
    #[must_use]
    pub fn has_signal(&self) -> bool {
        self.name.is_some()
            || self.price.is_some()
            || self.availability.is_some_and(Availability::is_known)
    }
}

/// Where a document's HTML came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Plain HTTP GET.
    Static,
    /// Headless-browser DOM snapshot.
    Rendered,
}

/// Raw page HTML plus how it was obtained. Scoped to one extraction request.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub html: String,
    pub provenance: Provenance,
}

impl RawDocument {
    #[must_use]
    pub fn new(html: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            html: html.into(),
            provenance,
        }
    }
}
