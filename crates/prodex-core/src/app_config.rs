use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings for the extractor service, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub user_agent: String,
    pub static_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    pub request_deadline_secs: u64,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_ms: u64,
    pub chrome_path: Option<PathBuf>,
}
