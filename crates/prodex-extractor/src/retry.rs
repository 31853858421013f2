//! Retry policy for the static GET.
//!
//! Only HTTP 429 and network-level errors are retried. Missing markers,
//! non-2xx statuses, and timeouts come back at once so the caller can
//! escalate to the browser instead.

use std::future::Future;
use std::time::Duration;

use crate::error::ExtractorError;
use crate::settings::ExtractorSettings;

/// Longest `Retry-After` the fetcher is willing to sit through.
const RETRY_AFTER_CAP: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub(crate) fn from_settings(settings: &ExtractorSettings) -> Self {
        Self {
            max_retries: settings.fetch_max_retries,
            backoff_base: Duration::from_millis(settings.fetch_backoff_base_ms),
        }
    }

    /// Delay before retry number `retry` (zero-based): `base * 2^retry`,
    /// stretched to a server-supplied `Retry-After` when that is longer.
    pub(crate) fn delay(&self, retry: u32, err: &ExtractorError) -> Duration {
        let backoff = self.backoff_base.saturating_mul(2u32.saturating_pow(retry));
        match err {
            ExtractorError::RateLimited {
                retry_after_secs, ..
            } => backoff.max(Duration::from_secs(*retry_after_secs).min(RETRY_AFTER_CAP)),
            _ => backoff,
        }
    }

    /// Runs `operation` until it succeeds, fails with a permanent error, or
    /// the retry budget is spent. The last error is returned as-is.
    pub(crate) async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ExtractorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExtractorError>>,
    {
        let mut retry = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && retry < self.max_retries => {
                    let delay = self.delay(retry, &err);
                    tracing::warn!(
                        retry = retry + 1,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "static fetch failed transiently, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_transient(err: &ExtractorError) -> bool {
    matches!(
        err,
        ExtractorError::RateLimited { .. } | ExtractorError::Http(_)
    )
}
