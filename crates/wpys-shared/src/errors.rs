//! # Error Types
//!
//! Unified error handling for the wpys job execution subsystem.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type WpysResult<T> = Result<T, WpysError>;

/// Errors surfaced by the registry, parser, broker, worker and dispatcher.
#[derive(Debug, Error)]
pub enum WpysError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("validation error: {field} - {reason}")]
    ValidationError { field: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("process error: {0}")]
    ProcessError(String),

    #[error("job {job_id} was cancelled")]
    Cancelled { job_id: String },

    #[error("monotonicity violation: percent_completed went from {previous} to {attempted}")]
    MonotonicityViolation { previous: u8, attempted: u8 },

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl WpysError {
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    pub fn validation_error(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::BackendError(message.into())
    }

    pub fn process_error(message: impl Into<String>) -> Self {
        Self::ProcessError(message.into())
    }

    pub fn cancelled(job_id: impl Into<String>) -> Self {
        Self::Cancelled {
            job_id: job_id.into(),
        }
    }

    /// Whether retrying the operation that produced this error is worthwhile.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BackendError(_))
    }
}
