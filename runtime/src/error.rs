//! Error types for render operations.
//!
//! Every failure a render call can hit maps to one of these kinds. Network
//! and parse failures in the lite path are converted by the engine into
//! `backend = "error"` results rather than bubbling to the caller.

/// Error type for fetch, render, chunk, and cache operations.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// DNS, connect, TLS, or transport failure during the raw fetch.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Non-2xx HTTP response during the raw fetch.
    #[error("fetch returned HTTP {status}")]
    FetchStatus { status: u16 },

    /// Deadline exceeded at fetch, navigation, or wait-for-text.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// The browser driver could not be loaded or launched.
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    /// Driver error during navigation or in-page extraction.
    #[error("browser navigation failed: {0}")]
    BrowserNavigation(String),

    /// Malformed JSON when reading a cache entry. Treated as a miss.
    #[error("cache entry parse failed: {0}")]
    Parse(String),

    /// Backing-store failure. Non-fatal to a render call.
    #[error("cache I/O failed: {0}")]
    CacheIo(String),

    /// Caller-requested cancellation.
    #[error("cancelled")]
    Cancelled,
}

impl RenderError {
    /// Short kind tag used in error results and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Fetch(_) => "FetchFailure",
            RenderError::FetchStatus { .. } => "FetchStatus",
            RenderError::Timeout(_) => "Timeout",
            RenderError::BrowserUnavailable(_) => "BrowserUnavailable",
            RenderError::BrowserNavigation(_) => "BrowserNavigation",
            RenderError::Parse(_) => "Parse",
            RenderError::CacheIo(_) => "CacheIO",
            RenderError::Cancelled => "Cancelled",
        }
    }
}

impl From<rusqlite::Error> for RenderError {
    fn from(e: rusqlite::Error) -> Self {
        RenderError::CacheIo(e.to_string())
    }
}

/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;
