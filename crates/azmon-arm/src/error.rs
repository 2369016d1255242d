//! Error types for building ARM clients.

use thiserror::Error;

/// Result type alias for client construction.
pub type ArmResult<T> = Result<T, ArmError>;

/// Errors raised while constructing credentials and clients. Errors from
/// calls themselves are [`azmon_core::ClientError`]s.
#[derive(Debug, Error)]
pub enum ArmError {
    #[error("invalid credential: {0}")]
    Credential(String),

    #[error("invalid endpoint {endpoint}: {message}")]
    Endpoint { endpoint: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}
