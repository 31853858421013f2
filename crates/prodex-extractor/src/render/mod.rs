//! Browser-backed page rendering.
//!
//! [`PageRenderer`] is the seam between the cascade and the headless browser:
//! the cascade only ever asks for a full DOM snapshot or a quick name/price
//! read, and every call gets its own isolated browser instance.

pub mod chromium;

use async_trait::async_trait;
use prodex_core::{ProductRecord, RawDocument};

use crate::error::ExtractorError;

pub use chromium::ChromiumRenderer;

/// Elements whose appearance means a full render has product content.
pub const FULL_RENDER_SELECTORS: &str = r#"script[type="application/ld+json"], script[type="application/json"], script[id^="ProductJson-"], .product-details, .price, h1, h2.product-title__title"#;

/// Elements the quick read waits for.
pub const QUICK_RENDER_SELECTORS: &str = "h1, h2.product-title__title, .price";

pub const PRICE_SELECTOR: &str = ".price";
pub const HEADING_SELECTORS: [&str; 2] = ["h1", "h2.product-title__title"];

/// A headless browser that can render product pages.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigates to `url`, waits for product selectors (a timeout here is not
    /// an error), and returns the DOM as HTML.
    async fn render_full(&self, url: &str) -> Result<RawDocument, ExtractorError>;

    /// Navigates to `url` and reads the price and heading elements directly.
    /// The record carries at most a name and a price.
    async fn render_quick(&self, url: &str) -> Result<ProductRecord, ExtractorError>;
}

/// Renderer used when no browser is available. Every call fails, so the
/// cascade degrades to static-only behaviour.
pub struct DisabledRenderer;

#[async_trait]
impl PageRenderer for DisabledRenderer {
    async fn render_full(&self, _url: &str) -> Result<RawDocument, ExtractorError> {
        Err(ExtractorError::Browser(
            "browser rendering is disabled".to_string(),
        ))
    }

    async fn render_quick(&self, _url: &str) -> Result<ProductRecord, ExtractorError> {
        Err(ExtractorError::Browser(
            "browser rendering is disabled".to_string(),
        ))
    }
}
