//! Shared error taxonomy
//!
//! Every caller-facing operation fails with one of these six kinds; anything
//! a dependency throws that has no better mapping becomes `Internal`.
//! Validation and permission errors are raised before any side effect.

use thiserror::Error;

/// The fixed error vocabulary for caller-facing operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No caller identity was presented.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller lacks the required role or relationship.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed or out-of-range input, reported per field.
    #[error("invalid argument `{field}`: {message}")]
    InvalidArgument { field: String, message: String },

    /// The request is valid but current state disallows the action.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// A referenced record is absent.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Unexpected failure in a dependency.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        EngineError::Unauthenticated(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        EngineError::PermissionDenied(message.into())
    }

    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        EngineError::FailedPrecondition(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal(message.into())
    }

    /// Stable wire code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Unauthenticated(_) => "UNAUTHENTICATED",
            EngineError::PermissionDenied(_) => "PERMISSION_DENIED",
            EngineError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            EngineError::FailedPrecondition(_) => "FAILED_PRECONDITION",
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::Internal(_) => "INTERNAL",
        }
    }
}

/// Result type for caller-facing operations
pub type EngineResult<T> = Result<T, EngineError>;
