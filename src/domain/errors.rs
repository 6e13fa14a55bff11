//! Domain errors for the Cadence automation engine.

use thiserror::Error;
use uuid::Uuid;

use crate::infrastructure::http::ServiceError;

/// Domain-level errors that can occur in the Cadence system.
///
/// Structural failures (unknown workflow, illegal transition, bad trigger)
/// are always reported as explicit `Err` values at the service surface,
/// never as panics.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Workflow definition not found: {0}")]
    WorkflowNotFound(String),

    #[error("Workflow instance not found: {0}")]
    InstanceNotFound(Uuid),

    #[error("Invalid state transition from '{from}' to '{to}' in workflow '{workflow}'")]
    InvalidTransition {
        workflow: String,
        from: String,
        to: String,
    },

    #[error("Transition from '{from}' to '{to}' rejected by hook: {reason}")]
    TransitionRejected {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("External service error: {0}")]
    ExternalService(#[from] ServiceError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
