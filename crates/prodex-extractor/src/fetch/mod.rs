//! Static page retrieval and the fetch-level fallback to the browser.

mod url;

use prodex_core::{Provenance, RawDocument};
use reqwest::Client;

use crate::error::ExtractorError;
use crate::render::PageRenderer;
use crate::retry::RetryPolicy;
use crate::settings::ExtractorSettings;

pub(crate) use url::host_of;
pub use url::validate_url;

/// Substrings whose presence suggests the raw HTML carries product data.
pub const PRODUCT_MARKERS: [&str; 4] = [
    r#"<script type="application/ld+json""#,
    r#"<script type="application/json""#,
    "og:title",
    "product:price:amount",
];

/// Returns `true` if `html` contains at least one of [`PRODUCT_MARKERS`].
#[must_use]
pub fn has_product_markers(html: &str) -> bool {
    PRODUCT_MARKERS.iter().any(|marker| html.contains(marker))
}

/// Whether a failed static fetch may escalate to the browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Fall back to a full browser render on any static failure.
    #[default]
    Escalate,
    /// Return the static failure as-is.
    StaticOnly,
}

/// Plain HTTP GET with a browser user agent, timeout, and retry on
/// transient errors.
pub struct StaticFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl StaticFetcher {
    /// # Errors
    ///
    /// Returns [`ExtractorError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(settings: &ExtractorSettings) -> Result<Self, ExtractorError> {
        let client = Client::builder()
            .timeout(settings.static_timeout)
            .connect_timeout(settings.static_timeout.min(std::time::Duration::from_secs(10)))
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            retry: RetryPolicy::from_settings(settings),
        })
    }

    /// Fetches `url` and gates the body on [`has_product_markers`].
    ///
    /// The marker scan runs before the status check, so a markerless error
    /// page reports `NoMarkers` rather than its status.
    ///
    /// # Errors
    ///
    /// - [`ExtractorError::NoMarkers`]: body has none of the markers.
    /// - [`ExtractorError::UnexpectedStatus`]: non-2xx status with markers present.
    /// - [`ExtractorError::RateLimited`]: HTTP 429 after all retries.
    /// - [`ExtractorError::Timeout`]: the GET exceeded the static timeout.
    /// - [`ExtractorError::Http`]: network or TLS failure after all retries.
    pub async fn fetch(&self, url: &str) -> Result<RawDocument, ExtractorError> {
        let html = self.get(url, true).await?;
        Ok(RawDocument::new(html, Provenance::Static))
    }

    /// Fetches `url` without the marker gate. Used by the text fallback.
    ///
    /// # Errors
    ///
    /// Same as [`StaticFetcher::fetch`], minus `NoMarkers`.
    pub async fn fetch_unchecked(&self, url: &str) -> Result<String, ExtractorError> {
        self.get(url, false).await
    }

    async fn get(&self, url: &str, require_markers: bool) -> Result<String, ExtractorError> {
        self.retry.run(|| async move {
            let response = self
                .client
                .get(url)
                .header(
                    reqwest::header::ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header(reqwest::header::ACCEPT_LANGUAGE, "ar,en-US;q=0.9,en;q=0.8")
                .send()
                .await
                .map_err(|e| classify(e, url))?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(1);
                return Err(ExtractorError::RateLimited {
                    url: url.to_owned(),
                    retry_after_secs,
                });
            }

            let bytes = response.bytes().await.map_err(|e| classify(e, url))?;
            let html = String::from_utf8_lossy(&bytes).into_owned();

            if require_markers && !has_product_markers(&html) {
                return Err(ExtractorError::NoMarkers {
                    url: url.to_owned(),
                });
            }
            if !status.is_success() {
                return Err(ExtractorError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            tracing::debug!(host = %host_of(url), bytes = html.len(), "static fetch ok");
            Ok(html)
        })
        .await
    }
}

fn classify(err: reqwest::Error, url: &str) -> ExtractorError {
    if err.is_timeout() {
        ExtractorError::Timeout {
            url: url.to_owned(),
        }
    } else {
        ExtractorError::Http(err)
    }
}

/// Obtains the document the parser stages run on.
///
/// Tries the static GET first. Any failure escalates to a full browser
/// render unless `mode` is [`FetchMode::StaticOnly`]; if the render also
/// fails, its error is returned.
///
/// # Errors
///
/// The static error in static-only mode, otherwise the renderer's error.
pub async fn fetch_document(
    fetcher: &StaticFetcher,
    renderer: &dyn PageRenderer,
    url: &str,
    mode: FetchMode,
) -> Result<RawDocument, ExtractorError> {
    match fetcher.fetch(url).await {
        Ok(doc) => Ok(doc),
        Err(err) if mode == FetchMode::StaticOnly => Err(err),
        Err(err) => {
            tracing::warn!(
                host = %host_of(url),
                error = %err,
                "static fetch failed, falling back to browser render"
            );
            renderer.render_full(url).await
        }
    }
}

#[cfg(test)]
#[path = "../fetch_test.rs"]
mod tests;
