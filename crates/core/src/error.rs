//! Unified error types for harvest.
//!
//! Only fetch-side and configuration problems are errors. Cache lookups and the
//! query pipeline never fail: absence and malformed input are normal results.

use crate::config::ConfigError;
use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the harvest serving core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid request parameters (e.g., empty resource id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The extraction collaborator failed to produce records.
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),

    /// The fetch (or the wait for a sibling fetch) exceeded its deadline.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// The extraction service answered with a non-success status.
    #[error("UPSTREAM_STATUS: {status}")]
    UpstreamStatus { status: u16 },

    /// The extraction service returned an unreadable payload.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),

    /// Configuration could not be loaded or is invalid.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// A response could not be serialized.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a retry of the same fetch could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::FetchFailed(_) | Error::FetchTimeout(_) => true,
            Error::UpstreamStatus { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::FetchFailed(_) => -32000,
            Error::FetchTimeout(_) => -32006,
            Error::UpstreamStatus { .. } => -32008,
            Error::Parse(_) => -32001,
            Error::Config(_) => -32002,
            Error::Serialization(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
