//! Command handlers for the CLI.
//!
//! Output goes to stdout as pretty-printed JSON; logs go to stderr so the
//! two can be piped separately.

use std::sync::Arc;

use prodex_core::AppConfig;
use prodex_extractor::{DisabledRenderer, Extractor, ExtractorSettings, FetchMode, PageRenderer};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunOptions {
    pub static_only: bool,
    pub no_browser: bool,
}

impl RunOptions {
    pub(crate) fn fetch_mode(self) -> FetchMode {
        if self.static_only {
            FetchMode::StaticOnly
        } else {
            FetchMode::Escalate
        }
    }
}

pub(crate) fn build_extractor(
    config: &AppConfig,
    options: RunOptions,
) -> anyhow::Result<Extractor> {
    let settings = ExtractorSettings::from_app_config(config);
    let extractor = if options.no_browser {
        let renderer: Arc<dyn PageRenderer> = Arc::new(DisabledRenderer);
        Extractor::with_renderer(&settings, renderer)
    } else {
        Extractor::new(&settings)
    }
    .map_err(|e| anyhow::anyhow!("failed to build extractor: {e}"))?;
    Ok(extractor)
}

/// Extract one page and print either the bare record or, with `trace`, the
/// full [`prodex_extractor::Extraction`].
///
/// # Errors
///
/// Returns an error if the extractor cannot be built or the cascade fails
/// before any stage produced a record.
pub(crate) async fn run_extract(
    config: &AppConfig,
    url: &str,
    options: RunOptions,
    trace: bool,
) -> anyhow::Result<()> {
    let extractor = build_extractor(config, options)?;
    let extraction = extractor
        .extract_traced(url, options.fetch_mode())
        .await
        .map_err(|e| anyhow::anyhow!("extraction of {url} failed ({:?}): {e}", e.kind()))?;

    tracing::info!(
        url,
        stage = %extraction.stage,
        provenance = ?extraction.provenance,
        "extraction finished"
    );

    if trace {
        print_json(&extraction)
    } else {
        print_json(&extraction.record)
    }
}

/// # Errors
///
/// Returns an error if the extractor cannot be built or the page cannot be
/// fetched.
pub(crate) async fn run_fields(
    config: &AppConfig,
    url: &str,
    options: RunOptions,
) -> anyhow::Result<()> {
    let extractor = build_extractor(config, options)?;
    let report = extractor
        .describe_fields(url, options.fetch_mode())
        .await
        .map_err(|e| anyhow::anyhow!("field report for {url} failed: {e}"))?;
    print_json(&report)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
