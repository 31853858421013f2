//! Typed views over the machine-readable product payloads embedded in pages.
//!
//! ## Linked data (`<script type="application/ld+json">`)
//! schema.org `Product` nodes. `@type` may be a string or an array of
//! strings. `offers` may be a single `Offer`, an `AggregateOffer` (which
//! carries `lowPrice` instead of `price`), or an array whose first element
//! wins. `image` may be a URL string, an `ImageObject` with `url`, or an
//! array mixing both.
//!
//! ## Platform product JSON (`<script id="ProductJson-...">`)
//! Storefront themes embed the product as JSON with `title`, `body_html`,
//! `images` and `variants`. Theme builds emit `images` as URL strings;
//! the public `products.json` shape uses `{ "src": ... }` objects. Both are
//! accepted. The first variant supplies `price` (string or number) and the
//! boolean `available`.
//!
//! ## Generic JSON (`<script type="application/json">`)
//! Any object that has both `title` and `variants` keys is read with the
//! platform shape.

use prodex_core::{Availability, ProductRecord};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::normalize::{availability_from_uri, parse_price_value, trimmed};

/// Which embedded shape produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    LinkedData,
    PlatformJson,
    GenericJson,
}

/// A validated product payload, one variant per embedded shape.
#[derive(Debug, Clone)]
pub enum ProductPayload {
    LinkedData(LinkedDataProduct),
    PlatformJson(PlatformProduct),
    GenericJson(PlatformProduct),
}

impl ProductPayload {
    #[must_use]
    pub fn kind(&self) -> PayloadKind {
        match self {
            ProductPayload::LinkedData(_) => PayloadKind::LinkedData,
            ProductPayload::PlatformJson(_) => PayloadKind::PlatformJson,
            ProductPayload::GenericJson(_) => PayloadKind::GenericJson,
        }
    }

    #[must_use]
    pub fn into_record(self) -> ProductRecord {
        match self {
            ProductPayload::LinkedData(product) => product.into_record(),
            ProductPayload::PlatformJson(product) | ProductPayload::GenericJson(product) => {
                product.into_record()
            }
        }
    }
}

/// A schema.org `Product` node with its fields already extracted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkedDataProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub price: Option<Decimal>,
    pub availability: Option<Availability>,
}

impl LinkedDataProduct {
    /// Reads a single linked-data item. Returns `None` unless its `@type` is
    /// (or contains) `"Product"`.
    #[must_use]
    pub fn from_item(item: &Value) -> Option<Self> {
        if !is_product_type(item.get("@type")?) {
            return None;
        }

        let offer = item.get("offers").and_then(|o| match o {
            Value::Array(list) => list.first(),
            other => Some(other),
        });

        let price = offer.and_then(|o| {
            o.get("price")
                .and_then(parse_price_value)
                .or_else(|| o.get("lowPrice").and_then(parse_price_value))
        });
        let availability = offer
            .and_then(|o| o.get("availability"))
            .and_then(Value::as_str)
            .and_then(availability_from_uri);

        Some(Self {
            name: item.get("name").and_then(Value::as_str).and_then(trimmed),
            description: item
                .get("description")
                .and_then(Value::as_str)
                .and_then(trimmed),
            images: item.get("image").map(image_urls).unwrap_or_default(),
            price,
            availability,
        })
    }

    fn into_record(self) -> ProductRecord {
        ProductRecord {
            name: self.name,
            description: self.description,
            images: self.images,
            price: self.price,
            availability: self.availability,
        }
    }
}

fn is_product_type(node: &Value) -> bool {
    match node {
        Value::String(s) => s == "Product",
        Value::Array(types) => types.iter().filter_map(Value::as_str).any(|s| s == "Product"),
        _ => false,
    }
}

/// Normalizes a linked-data `image` field to a list of URLs.
fn image_urls(node: &Value) -> Vec<String> {
    match node {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Object(obj) => obj
            .get("url")
            .and_then(Value::as_str)
            .map(|s| vec![s.trim().to_string()])
            .unwrap_or_default(),
        Value::Array(items) => items.iter().flat_map(image_urls).collect(),
        _ => Vec::new(),
    }
}

/// Storefront product JSON, shared by the platform and generic shapes.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformProduct {
    #[serde(default)]
    pub title: Option<String>,

    /// Raw HTML description. Passed through unchanged.
    #[serde(default)]
    pub body_html: Option<String>,

    #[serde(default)]
    pub images: Vec<PlatformImage>,

    #[serde(default)]
    pub variants: Vec<PlatformVariant>,
}

/// One entry of a storefront `images` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlatformImage {
    Url(String),
    Object { src: String },
    /// Anything else (nulls, objects without `src`) is ignored.
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformVariant {
    /// Decimal string (`"30.00"`) or bare number, depending on the theme.
    #[serde(default)]
    pub price: Option<Value>,

    /// Absent on some themes; a missing flag reads as not available.
    #[serde(default)]
    pub available: Option<bool>,
}

impl PlatformProduct {
    /// Reads a generic JSON object as a product when it has both a `title`
    /// and a `variants` key. Returns `None` for every other shape.
    #[must_use]
    pub fn from_generic(value: Value) -> Option<Self> {
        let obj = value.as_object()?;
        if !(obj.contains_key("title") && obj.contains_key("variants")) {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    fn into_record(self) -> ProductRecord {
        let first = self.variants.into_iter().next();
        let price = first
            .as_ref()
            .and_then(|v| v.price.as_ref())
            .and_then(parse_price_value);
        let availability = first.map(|v| Availability::from(v.available.unwrap_or(false)));

        let images = self
            .images
            .into_iter()
            .filter_map(|image| match image {
                PlatformImage::Url(url) | PlatformImage::Object { src: url } => trimmed(&url),
                PlatformImage::Other(_) => None,
            })
            .collect();

        ProductRecord {
            name: self.title.as_deref().and_then(trimmed),
            description: self.body_html.filter(|s| !s.trim().is_empty()),
            images,
            price,
            availability,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    #[test]
    fn linked_data_reads_offer_list_and_wraps_bare_image() {
        let item = json!({
            "@type": "Product",
            "name": "Desk Lamp",
            "image": "https://cdn.example.com/lamp.jpg",
            "offers": [
                {"price": "89.00", "availability": "https://schema.org/InStock"},
                {"price": "99.00", "availability": "https://schema.org/OutOfStock"}
            ]
        });
        let product = LinkedDataProduct::from_item(&item).expect("product node");
        assert_eq!(product.name.as_deref(), Some("Desk Lamp"));
        assert_eq!(product.images, vec!["https://cdn.example.com/lamp.jpg"]);
        assert_eq!(product.price, Some(Decimal::from_str("89").unwrap()));
        assert_eq!(product.availability, Some(Availability::InStock));
    }

    #[test]
    fn linked_data_accepts_type_array_and_aggregate_offer() {
        let item = json!({
            "@type": ["Product", "Thing"],
            "name": "Kettle",
            "image": [{"@type": "ImageObject", "url": "https://cdn.example.com/k1.jpg"}, "https://cdn.example.com/k2.jpg"],
            "offers": {"@type": "AggregateOffer", "lowPrice": 35.5}
        });
        let product = LinkedDataProduct::from_item(&item).expect("product node");
        assert_eq!(
            product.images,
            vec!["https://cdn.example.com/k1.jpg", "https://cdn.example.com/k2.jpg"]
        );
        assert_eq!(product.price, Some(Decimal::from_str("35.5").unwrap()));
        assert_eq!(product.availability, None);
    }

    #[test]
    fn linked_data_ignores_non_product_nodes() {
        assert!(LinkedDataProduct::from_item(&json!({"@type": "BreadcrumbList"})).is_none());
        assert!(LinkedDataProduct::from_item(&json!({"name": "untyped"})).is_none());
    }

    #[test]
    fn platform_product_maps_first_variant() {
        let product: PlatformProduct = serde_json::from_value(json!({
            "title": "Cold Brew",
            "body_html": "<p>Smooth</p>",
            "images": ["//cdn.example.com/a.jpg", {"src": "https://cdn.example.com/b.jpg"}, null],
            "variants": [{"price": "12.99", "available": false}, {"price": "20.00", "available": true}]
        }))
        .expect("platform json");
        let record = ProductPayload::PlatformJson(product).into_record();
        assert_eq!(record.name.as_deref(), Some("Cold Brew"));
        assert_eq!(record.description.as_deref(), Some("<p>Smooth</p>"));
        assert_eq!(
            record.images,
            vec!["//cdn.example.com/a.jpg", "https://cdn.example.com/b.jpg"]
        );
        assert_eq!(record.price, Some(Decimal::from_str("12.99").unwrap()));
        assert_eq!(record.availability, Some(Availability::OutOfStock));
    }

    #[test]
    fn variant_without_available_flag_is_out_of_stock() {
        let product: PlatformProduct = serde_json::from_value(json!({
            "title": "Tote Bag",
            "variants": [{"price": "15.00"}]
        }))
        .expect("platform json");
        let record = ProductPayload::PlatformJson(product).into_record();
        assert_eq!(record.price, Some(Decimal::from_str("15.00").unwrap()));
        assert_eq!(record.availability, Some(Availability::OutOfStock));
    }

    #[test]
    fn platform_product_without_variants_has_no_price() {
        let product: PlatformProduct =
            serde_json::from_value(json!({"title": "Gift Card", "variants": []})).unwrap();
        let record = ProductPayload::GenericJson(product).into_record();
        assert_eq!(record.price, None);
        assert_eq!(record.availability, None);
    }

    #[test]
    fn generic_requires_title_and_variants() {
        assert!(PlatformProduct::from_generic(json!({"title": "x"})).is_none());
        assert!(PlatformProduct::from_generic(json!({"variants": []})).is_none());
        assert!(PlatformProduct::from_generic(json!(["title", "variants"])).is_none());
        assert!(PlatformProduct::from_generic(json!({"title": "x", "variants": []})).is_some());
    }
}
