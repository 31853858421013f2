use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("static fetch of {url} timed out")]
    Timeout { url: String },

    #[error("no product markers in HTML from {url}")]
    NoMarkers { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("rate limited by {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("browser {phase} timed out for {url}")]
    RenderTimeout { url: String, phase: RenderPhase },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("extraction of {url} exceeded the {deadline_secs}s request deadline")]
    DeadlineExceeded { url: String, deadline_secs: u64 },
}

/// Which browser wait ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Navigation,
    SelectorWait,
}

impl std::fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderPhase::Navigation => write!(f, "navigation"),
            RenderPhase::SelectorWait => write!(f, "selector wait"),
        }
    }
}

/// Coarse failure class used by callers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network, TLS, or HTTP-status failure while retrieving the page.
    Fetch,
    /// The page was retrieved but carries no product markers.
    NoMarkers,
    /// The browser or the overall request deadline ran out of time.
    Timeout,
    /// Browser launch or protocol failure.
    Browser,
    /// The caller supplied something unusable.
    InvalidInput,
}

impl ExtractorError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractorError::Http(_)
            | ExtractorError::Timeout { .. }
            | ExtractorError::UnexpectedStatus { .. }
            | ExtractorError::RateLimited { .. } => ErrorKind::Fetch,
            ExtractorError::NoMarkers { .. } => ErrorKind::NoMarkers,
            ExtractorError::RenderTimeout { .. } | ExtractorError::DeadlineExceeded { .. } => {
                ErrorKind::Timeout
            }
            ExtractorError::Browser(_) => ErrorKind::Browser,
            ExtractorError::InvalidUrl { .. } => ErrorKind::InvalidInput,
        }
    }
}
