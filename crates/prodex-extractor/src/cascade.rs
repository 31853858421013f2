//! The extraction cascade.
//!
//! One request runs these stages strictly in order and stops at the first
//! that yields signal:
//!
//! 1. fetch (static GET, escalating to a full browser render)
//! 2. structured payloads
//! 3. meta tags (needs a name or a price)
//! 4. free-text heuristics (needs a price or an availability)
//! 5. quick browser read
//! 6. readability text and images (terminal, always returns)
//!
//! Only a stage-1 failure is an error. Every later stage that fails or
//! finds nothing is recorded as [`AttemptOutcome::NoSignal`] and the cascade
//! moves on.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use prodex_core::{ProductRecord, Provenance, RawDocument};
use scraper::Html;
use serde::Serialize;
use tokio::time::Instant;

use crate::diagnostics::{describe_fields, FieldReport};
use crate::error::ExtractorError;
use crate::fallback::{absolute_images, extract_fallback};
use crate::fetch::{self, host_of, validate_url, FetchMode, StaticFetcher};
use crate::heuristic::parse_heuristic;
use crate::meta::parse_meta;
use crate::render::{ChromiumRenderer, PageRenderer};
use crate::settings::ExtractorSettings;
use crate::structured::parse_structured;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Structured,
    Meta,
    Heuristic,
    DynamicQuick,
    TextFallback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Structured => write!(f, "structured"),
            Stage::Meta => write!(f, "meta"),
            Stage::Heuristic => write!(f, "heuristic"),
            Stage::DynamicQuick => write!(f, "dynamic_quick"),
            Stage::TextFallback => write!(f, "text_fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Record(ProductRecord),
    NoSignal,
}

/// What one stage produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionAttempt {
    pub stage: Stage,
    pub outcome: AttemptOutcome,
}

impl ExtractionAttempt {
    fn record(stage: Stage, record: &ProductRecord) -> Self {
        Self {
            stage,
            outcome: AttemptOutcome::Record(record.clone()),
        }
    }

    fn no_signal(stage: Stage) -> Self {
        Self {
            stage,
            outcome: AttemptOutcome::NoSignal,
        }
    }
}

/// A finished cascade run: the returned record, the stage that produced it,
/// where the parsed HTML came from, and every attempt in order.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub record: ProductRecord,
    pub stage: Stage,
    pub provenance: Provenance,
    pub attempts: Vec<ExtractionAttempt>,
}

/// Outcome of the stages that run on the fetched document.
struct DocumentStages {
    decided: Option<(Stage, ProductRecord)>,
    /// Only collected when no stage decided.
    fallback_images: Vec<String>,
}

/// Runs the cascade. Holds no per-request state and is shared across
/// requests behind an `Arc`.
pub struct Extractor {
    fetcher: StaticFetcher,
    renderer: Arc<dyn PageRenderer>,
    request_deadline: Duration,
}

impl Extractor {
    /// Builds an extractor that renders with a local Chromium.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &ExtractorSettings) -> Result<Self, ExtractorError> {
        Self::with_renderer(settings, Arc::new(ChromiumRenderer::new(settings)))
    }

    /// Builds an extractor around an arbitrary renderer.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Http`] if the HTTP client cannot be built.
    pub fn with_renderer(
        settings: &ExtractorSettings,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self, ExtractorError> {
        Ok(Self {
            fetcher: StaticFetcher::new(settings)?,
            renderer,
            request_deadline: settings.request_deadline,
        })
    }

    /// Extracts a product record from `url`, escalating to the browser when
    /// the static fetch fails.
    ///
    /// # Errors
    ///
    /// See [`Extractor::extract_traced`].
    pub async fn extract(&self, url: &str) -> Result<ProductRecord, ExtractorError> {
        self.extract_with_mode(url, FetchMode::Escalate).await
    }

    /// # Errors
    ///
    /// See [`Extractor::extract_traced`].
    pub async fn extract_with_mode(
        &self,
        url: &str,
        mode: FetchMode,
    ) -> Result<ProductRecord, ExtractorError> {
        Ok(self.extract_traced(url, mode).await?.record)
    }

    /// Runs the whole cascade under the request deadline and returns the
    /// record together with the per-stage attempts.
    ///
    /// # Errors
    ///
    /// - [`ExtractorError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    /// - Any fetch error when no document could be obtained.
    /// - [`ExtractorError::DeadlineExceeded`] if the cascade outran the deadline.
    pub async fn extract_traced(
        &self,
        url: &str,
        mode: FetchMode,
    ) -> Result<Extraction, ExtractorError> {
        let url = validate_url(url)?;
        self.within_deadline(url.as_str(), self.run_cascade(url.as_str(), mode))
            .await
    }

    /// Fetches the document the parser stages would see, under the request
    /// deadline.
    ///
    /// # Errors
    ///
    /// Same as [`Extractor::extract_traced`].
    pub async fn fetch_document(
        &self,
        url: &str,
        mode: FetchMode,
    ) -> Result<RawDocument, ExtractorError> {
        let url = validate_url(url)?;
        self.within_deadline(
            url.as_str(),
            fetch::fetch_document(&self.fetcher, self.renderer.as_ref(), url.as_str(), mode),
        )
        .await
    }

    /// Fetches `url` and enumerates its linked-data, itemprop, and meta
    /// fields.
    ///
    /// # Errors
    ///
    /// Same as [`Extractor::fetch_document`].
    pub async fn describe_fields(
        &self,
        url: &str,
        mode: FetchMode,
    ) -> Result<FieldReport, ExtractorError> {
        let doc = self.fetch_document(url, mode).await?;
        Ok(describe_fields(&doc.html))
    }

    async fn within_deadline<T, F>(&self, url: &str, work: F) -> Result<T, ExtractorError>
    where
        F: std::future::Future<Output = Result<T, ExtractorError>>,
    {
        let deadline = Instant::now() + self.request_deadline;
        match tokio::time::timeout_at(deadline, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(host = %host_of(url), "request deadline exceeded");
                Err(ExtractorError::DeadlineExceeded {
                    url: url.to_owned(),
                    deadline_secs: self.request_deadline.as_secs(),
                })
            }
        }
    }

    async fn run_cascade(&self, url: &str, mode: FetchMode) -> Result<Extraction, ExtractorError> {
        let started = Instant::now();
        let host = host_of(url);

        let doc = fetch::fetch_document(&self.fetcher, self.renderer.as_ref(), url, mode).await?;
        tracing::debug!(%host, provenance = ?doc.provenance, "document fetched");

        let mut attempts = Vec::new();
        let stages = run_document_stages(&doc.html, &host, &mut attempts);

        let (stage, record) = if let Some(decided) = stages.decided {
            decided
        } else if let Some(record) = self.quick_render(url, &host, mode, &mut attempts).await {
            (Stage::DynamicQuick, record)
        } else {
            let record =
                extract_fallback(&self.fetcher, url, &doc.html, stages.fallback_images).await;
            attempts.push(ExtractionAttempt::record(Stage::TextFallback, &record));
            (Stage::TextFallback, record)
        };

        tracing::info!(
            %host,
            %stage,
            provenance = ?doc.provenance,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "extraction finished"
        );

        Ok(Extraction {
            record,
            stage,
            provenance: doc.provenance,
            attempts,
        })
    }

    async fn quick_render(
        &self,
        url: &str,
        host: &str,
        mode: FetchMode,
        attempts: &mut Vec<ExtractionAttempt>,
    ) -> Option<ProductRecord> {
        if mode == FetchMode::StaticOnly {
            return None;
        }

        match self.renderer.render_quick(url).await {
            Ok(record) if record.has_signal() => {
                tracing::debug!(%host, stage = %Stage::DynamicQuick, signal = true, "stage done");
                attempts.push(ExtractionAttempt::record(Stage::DynamicQuick, &record));
                Some(record)
            }
            Ok(_) => {
                tracing::debug!(%host, stage = %Stage::DynamicQuick, signal = false, "stage done");
                attempts.push(ExtractionAttempt::no_signal(Stage::DynamicQuick));
                None
            }
            Err(e) => {
                tracing::debug!(%host, stage = %Stage::DynamicQuick, error = %e, "stage failed");
                attempts.push(ExtractionAttempt::no_signal(Stage::DynamicQuick));
                None
            }
        }
    }
}

/// Runs the structured, meta and heuristic stages on one parsed document.
///
/// Kept synchronous: the parsed DOM is not `Send` and must be dropped before
/// the cascade awaits again.
fn run_document_stages(
    html: &str,
    host: &str,
    attempts: &mut Vec<ExtractionAttempt>,
) -> DocumentStages {
    let document = Html::parse_document(html);

    let mut decide = |stage: Stage, record: Option<ProductRecord>| {
        tracing::debug!(%host, %stage, signal = record.is_some(), "stage done");
        match record {
            Some(record) => {
                attempts.push(ExtractionAttempt::record(stage, &record));
                Some(DocumentStages {
                    decided: Some((stage, record)),
                    fallback_images: Vec::new(),
                })
            }
            None => {
                attempts.push(ExtractionAttempt::no_signal(stage));
                None
            }
        }
    };

    let structured = parse_structured(&document).filter(ProductRecord::has_signal);
    if let Some(done) = decide(Stage::Structured, structured) {
        return done;
    }

    let meta = parse_meta(&document);
    let meta_images = meta.images.clone();
    let meta = Some(meta).filter(|m| m.name.is_some() || m.price.is_some());
    if let Some(done) = decide(Stage::Meta, meta) {
        return done;
    }

    let heuristic = parse_heuristic(&document, &meta_images);
    if let Some(done) = decide(Stage::Heuristic, heuristic) {
        return done;
    }

    DocumentStages {
        decided: None,
        fallback_images: absolute_images(&document),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use prodex_core::Availability;
    use rust_decimal::Decimal;

    use super::*;

    fn stages(html: &str) -> (DocumentStages, Vec<ExtractionAttempt>) {
        let mut attempts = Vec::new();
        let result = run_document_stages(html, "shop.example.com", &mut attempts);
        (result, attempts)
    }

    #[test]
    fn structured_payload_short_circuits() {
        let (result, attempts) = stages(
            r#"<script type="application/ld+json">{"@type":"Product","name":"Lamp","offers":{"price":"10"}}</script>
               <meta property="og:title" content="Other">"#,
        );
        let (stage, record) = result.decided.expect("decided");
        assert_eq!(stage, Stage::Structured);
        assert_eq!(record.name.as_deref(), Some("Lamp"));
        assert_eq!(attempts.len(), 1);
    }

    #[test]
    fn empty_structured_record_does_not_stop_the_cascade() {
        let (result, attempts) = stages(
            r#"<script type="application/ld+json">{"@type":"Product"}</script>
               <meta property="og:title" content="From Meta">"#,
        );
        let (stage, record) = result.decided.expect("decided");
        assert_eq!(stage, Stage::Meta);
        assert_eq!(record.name.as_deref(), Some("From Meta"));
        assert_eq!(attempts[0], ExtractionAttempt::no_signal(Stage::Structured));
    }

    #[test]
    fn meta_availability_alone_falls_through_to_heuristics() {
        let (result, attempts) = stages(
            r#"<meta property="product:availability" content="instock">
               <meta property="og:image" content="https://cdn.example.com/og.jpg">
               <h1>Kettle</h1><p>Only 75 ريال</p>"#,
        );
        let (stage, record) = result.decided.expect("decided");
        assert_eq!(stage, Stage::Heuristic);
        assert_eq!(record.name.as_deref(), Some("Kettle"));
        assert_eq!(record.price, Some(Decimal::from_str("75").unwrap()));
        assert_eq!(record.images, vec!["https://cdn.example.com/og.jpg"]);
        assert_eq!(attempts.len(), 3);
    }

    #[test]
    fn heuristic_availability_terminates() {
        let (result, _) = stages("<title>T</title><p>Out of stock</p>");
        let (stage, record) = result.decided.expect("decided");
        assert_eq!(stage, Stage::Heuristic);
        assert_eq!(record.availability, Some(Availability::OutOfStock));
        assert_eq!(record.name.as_deref(), Some("T"));
    }

    #[test]
    fn undecided_document_collects_fallback_images() {
        let (result, attempts) = stages(
            r#"<p>About us</p><img src="https://cdn.example.com/team.jpg"><img src="/rel.png">"#,
        );
        assert!(result.decided.is_none());
        assert_eq!(result.fallback_images, vec!["https://cdn.example.com/team.jpg"]);
        assert!(attempts
            .iter()
            .all(|a| a.outcome == AttemptOutcome::NoSignal));
    }

    #[test]
    fn attempt_serializes_with_tagged_outcome() {
        let json = serde_json::to_value(ExtractionAttempt::no_signal(Stage::DynamicQuick))
            .expect("serialize");
        assert_eq!(json["stage"], "dynamic_quick");
        assert_eq!(json["outcome"]["kind"], "no_signal");
    }
}
