//! Request URL validation.

use crate::error::ExtractorError;

/// Parses `raw` and checks it is an absolute `http`/`https` URL with a host.
///
/// # Errors
///
/// Returns [`ExtractorError::InvalidUrl`] for anything else.
pub fn validate_url(raw: &str) -> Result<reqwest::Url, ExtractorError> {
    let invalid = |reason: &str| ExtractorError::InvalidUrl {
        url: raw.to_owned(),
        reason: reason.to_owned(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("url is empty"));
    }

    let url = reqwest::Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https URLs can be fetched"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("url has no host"));
    }
    Ok(url)
}

/// Host of `url` for log fields; falls back to the input.
pub(crate) fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
