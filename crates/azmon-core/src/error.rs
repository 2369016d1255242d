//! Error types for the metrics receiver.

use thiserror::Error;

/// Result type alias for receiver operations.
pub type ReceiverResult<T> = Result<T, ReceiverError>;

/// Result type alias for collaborator calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors returned by the inventory, catalog and metrics collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Errors that can occur while validating, expanding, normalizing or
/// collecting targets.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Missing or invalid identifiers and aggregations. Always detected
    /// before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// A declared resource type matched nothing, or the inventory could
    /// not be listed.
    #[error("error creating resource targets: {0}")]
    Expansion(String),

    /// Metric definitions could not be fetched or were malformed.
    #[error("metric definitions error for resource target {resource_id}: {message}")]
    Catalog {
        resource_id: String,
        message: String,
    },

    /// Transport or decode failure while listing metric values.
    #[error("error collecting metrics for resource target {resource_id}: {message}")]
    Collection {
        resource_id: String,
        message: String,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl ReceiverError {
    pub(crate) fn catalog(resource_id: &str, message: impl ToString) -> Self {
        Self::Catalog {
            resource_id: resource_id.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn collection(resource_id: &str, message: impl ToString) -> Self {
        Self::Collection {
            resource_id: resource_id.to_string(),
            message: message.to_string(),
        }
    }
}
