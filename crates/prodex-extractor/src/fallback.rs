//! Stage 6: description and image recovery. Never fails.

use std::sync::LazyLock;

use prodex_core::ProductRecord;
use reqwest::Url;
use scraper::{Html, Selector};

use crate::fetch::{host_of, StaticFetcher};
use crate::reader::readable_text;

static IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("valid img selector"));

/// Absolute (`http://` or `https://`) image sources in document order,
/// without duplicates.
#[must_use]
pub fn absolute_images(document: &Html) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for img in document.select(&IMG_SEL) {
        let Some(src) = img.value().attr("src").map(str::trim) else {
            continue;
        };
        let absolute = src.starts_with("http://") || src.starts_with("https://");
        if absolute && !images.iter().any(|seen| seen == src) {
            images.push(src.to_owned());
        }
    }
    images
}

/// Builds the terminal record: `images` from the first-stage document and a
/// readable description from a fresh GET of `url`. When that GET fails the
/// first-stage HTML is used for the description instead.
pub async fn extract_fallback(
    fetcher: &StaticFetcher,
    url: &str,
    stage_one_html: &str,
    images: Vec<String>,
) -> ProductRecord {
    let html = match fetcher.fetch_unchecked(url).await {
        Ok(html) => html,
        Err(e) => {
            tracing::debug!(
                host = %host_of(url),
                error = %e,
                "fallback re-fetch failed, reading the first-stage document"
            );
            stage_one_html.to_owned()
        }
    };
    let description = Url::parse(url)
        .ok()
        .and_then(|page_url| readable_text(&html, &page_url));

    ProductRecord {
        description,
        images,
        ..ProductRecord::default()
    }
}
