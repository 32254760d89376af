//! Error types for the dashboard's network boundaries.

use thiserror::Error;

/// Errors raised by the RPC client, market-data client, and configuration
/// parsing. None of these reach the view layer; the controller and poller
/// log them and keep their previous state.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Transport-level failure or non-success HTTP status.
    #[error("http error: {0}")]
    Http(String),

    /// JSON-RPC error object returned by the node.
    #[error("rpc error: {code} - {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the node.
        message: String,
    },

    /// Response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Request exceeded the configured deadline.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// Program identity is not a base58 encoded 32-byte key.
    #[error("invalid program id: {0}")]
    InvalidProgramId(String),
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::Decode(err.to_string())
        } else {
            DashboardError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}

/// Result alias for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;
