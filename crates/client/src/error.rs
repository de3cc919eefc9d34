//! Extraction client error types.

use harvest_core::Error;
use std::sync::Arc;

/// Errors from the extraction service client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// No extraction service configured.
    #[error("missing extractor URL: HARVEST_EXTRACTOR_URL not set")]
    MissingEndpoint,

    /// The configured extraction service URL is unusable.
    #[error("invalid extractor URL: {0}")]
    InvalidEndpoint(String),

    /// The resource URL could not be canonicalized.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Rate limited by the extraction service.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Response body exceeded the configured limit.
    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout } else { FetchError::Network(Arc::new(err)) }
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidTarget(msg) => Error::InvalidInput(msg),
            FetchError::RateLimited => Error::UpstreamStatus { status: 429 },
            FetchError::HttpError { status } => Error::UpstreamStatus { status },
            FetchError::Timeout => Error::FetchTimeout("extraction request timed out".into()),
            FetchError::Parse(msg) => Error::Parse(msg),
            other @ (FetchError::MissingEndpoint
            | FetchError::InvalidEndpoint(_)
            | FetchError::TooLarge { .. }
            | FetchError::Network(_)) => Error::FetchFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::MissingEndpoint;
        assert!(err.to_string().contains("HARVEST_EXTRACTOR_URL"));

        let err = FetchError::TooLarge { size: 10, limit: 5 };
        assert!(err.to_string().contains("10 bytes exceeds 5"));
    }

    #[test]
    fn test_into_core_error() {
        assert!(matches!(Error::from(FetchError::Timeout), Error::FetchTimeout(_)));
        assert!(matches!(Error::from(FetchError::RateLimited), Error::UpstreamStatus { status: 429 }));
        assert!(matches!(Error::from(FetchError::HttpError { status: 502 }), Error::UpstreamStatus { status: 502 }));
        assert!(matches!(Error::from(FetchError::Parse("bad".into())), Error::Parse(_)));
        assert!(matches!(Error::from(FetchError::InvalidTarget("x".into())), Error::InvalidInput(_)));
        assert!(matches!(Error::from(FetchError::MissingEndpoint), Error::FetchFailed(_)));
    }

    #[test]
    fn test_transient_after_conversion() {
        assert!(Error::from(FetchError::HttpError { status: 503 }).is_transient());
        assert!(!Error::from(FetchError::HttpError { status: 404 }).is_transient());
    }
}
