//! Error types for connectors.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when sampling a resource or building a connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The resource could not be reached.
    #[error("Resource unavailable: {0}")]
    Unavailable(String),

    /// I/O failure while reading the resource.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The resource answered with something that is not an attribute snapshot.
    #[error("Failed to parse attributes: {0}")]
    Parse(String),

    /// Sampling took longer than the poll timeout.
    #[error("Sampling timed out after {0:?}")]
    Timeout(Duration),

    /// No factory is registered for this connector kind.
    #[error("Unknown connector kind: {0}")]
    UnknownKind(String),

    /// The options given to a connector factory are invalid.
    #[error("Invalid options for '{kind}' connector: {reason}")]
    InvalidOptions { kind: String, reason: String },
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Parse(err.to_string())
    }
}
