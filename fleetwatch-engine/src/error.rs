//! Error types for the engine.

use thiserror::Error;

/// Contract violations reported by engine operations.
///
/// Degraded telemetry (unresolvable span parents, attributes without a
/// checker, faulty callbacks) never surfaces here; those are logged and
/// absorbed at the boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A bounded structure was configured with zero capacity.
    #[error("Invalid capacity for {what}: must be greater than zero")]
    InvalidCapacity { what: &'static str },

    /// An identifier that must be non-empty was empty.
    #[error("Empty identifier: {0}")]
    EmptyIdentifier(&'static str),

    /// No watcher is registered under this group name.
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    /// A watcher is already registered under this group name.
    #[error("Group already registered: {0}")]
    DuplicateGroup(String),

    /// A checker specification cannot be compiled.
    #[error("Invalid checker for attribute '{attribute}': {reason}")]
    InvalidChecker { attribute: String, reason: String },

    /// The trigger worker thread could not be started.
    #[error("Trigger dispatcher failed to start: {0}")]
    Dispatcher(#[from] std::io::Error),
}

/// Failure of an attribute checker to produce a verdict.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The checker cannot interpret this kind of value.
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// Any other policy failure.
    #[error("Checker failed: {0}")]
    Failed(String),
}

/// Failure of a trigger to handle a status transition.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The downstream channel or service is gone.
    #[error("Trigger target closed: {0}")]
    Closed(String),

    /// Any other delivery failure.
    #[error("Trigger failed: {0}")]
    Failed(String),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

pub(crate) fn require_non_empty(value: &str, what: &'static str) -> Result<()> {
    if value.is_empty() {
        Err(EngineError::EmptyIdentifier(what))
    } else {
        Ok(())
    }
}
