use std::path::PathBuf;
use std::time::Duration;

use prodex_core::{AppConfig, DEFAULT_USER_AGENT};

/// Runtime knobs for the fetchers and the cascade.
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    /// Sent by the static GET and by both browser modes.
    pub user_agent: String,
    pub static_timeout: Duration,
    pub navigation_timeout: Duration,
    /// Upper bound on the product-selector wait after navigation.
    pub selector_timeout: Duration,
    /// Wall-clock budget for one whole cascade run.
    pub request_deadline: Duration,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_ms: u64,
    /// Explicit Chromium binary; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
}

impl ExtractorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            static_timeout: Duration::from_secs(config.static_timeout_secs),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            selector_timeout: Duration::from_secs(config.selector_timeout_secs),
            request_deadline: Duration::from_secs(config.request_deadline_secs),
            fetch_max_retries: config.fetch_max_retries,
            fetch_backoff_base_ms: config.fetch_backoff_base_ms,
            chrome_path: config.chrome_path.clone(),
        }
    }
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            static_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(60),
            selector_timeout: Duration::from_secs(60),
            request_deadline: Duration::from_secs(180),
            fetch_max_retries: 1,
            fetch_backoff_base_ms: 500,
            chrome_path: None,
        }
    }
}
