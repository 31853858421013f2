use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Desktop Chrome user agent presented by both the static GET and the
/// headless browser unless `PRODEX_USER_AGENT` overrides it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    // Timeouts of zero would make every fetch fail instantly; reject them.
    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("PRODEX_ENV", "development"))?;

    let bind_addr = or_default("PRODEX_BIND_ADDR", "0.0.0.0:8000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PRODEX_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("PRODEX_LOG_LEVEL", "info");
    let user_agent = or_default("PRODEX_USER_AGENT", DEFAULT_USER_AGENT);

    let static_timeout_secs = parse_positive_u64("PRODEX_STATIC_TIMEOUT_SECS", "30")?;
    let navigation_timeout_secs = parse_positive_u64("PRODEX_NAVIGATION_TIMEOUT_SECS", "60")?;
    let selector_timeout_secs = parse_positive_u64("PRODEX_SELECTOR_TIMEOUT_SECS", "60")?;
    let request_deadline_secs = parse_positive_u64("PRODEX_REQUEST_DEADLINE_SECS", "180")?;

    let fetch_max_retries = parse_u32("PRODEX_FETCH_MAX_RETRIES", "1")?;
    let fetch_backoff_base_ms = or_default("PRODEX_FETCH_BACKOFF_BASE_MS", "500")
        .parse::<u64>()
        .map_err(|e| invalid("PRODEX_FETCH_BACKOFF_BASE_MS", e.to_string()))?;

    let chrome_path = lookup("PRODEX_CHROME_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        user_agent,
        static_timeout_secs,
        navigation_timeout_secs,
        selector_timeout_secs,
        request_deadline_secs,
        fetch_max_retries,
        fetch_backoff_base_ms,
        chrome_path,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PRODEX_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
