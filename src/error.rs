//! Hoard error types

/// Failure reported by a [`Fetcher`](crate::fetch::Fetcher).
///
/// The engine treats every variant as opaque; the distinction only matters
/// to fetch decorators such as [`RetryingFetcher`](crate::fetch::RetryingFetcher).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Transport failure before a response was received.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote answered with a non-success status.
    #[error("remote returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The body stream broke off mid-download.
    #[error("stream error: {0}")]
    Stream(String),

    /// The fetch task ended without reporting an outcome.
    #[error("fetch aborted before completion")]
    Aborted,
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport errors, broken streams, 429 and 5xx responses are transient.
    /// Other statuses (404, 403, ...) are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Stream(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Aborted => false,
        }
    }
}

/// Hoard error types
///
/// `Clone` so that a single fetch outcome can be handed to every caller
/// waiting on the same in-flight request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HoardError {
    /// Identifier is not a fetchable remote resource.
    #[error("invalid resource: {0}")]
    InvalidResource(String),

    /// The fetch capability failed (transport or non-success response).
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    /// Local filesystem error while writing or promoting an entry.
    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HoardError {
    /// The underlying fetch failure, if this error came from the fetcher.
    pub fn fetch_cause(&self) -> Option<&FetchError> {
        match self {
            HoardError::FetchFailed(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Result type alias for Hoard operations
pub type Result<T> = std::result::Result<T, HoardError>;
