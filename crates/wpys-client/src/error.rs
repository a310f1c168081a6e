//! # Client Error Types
//!
//! Unified error handling for client-facing operations, separate from
//! [`wpys_shared::errors::WpysError`] because a client also has to represent
//! the Dispatcher's ExceptionReport responses as typed failures.

use thiserror::Error;
use wpys_shared::errors::WpysError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("core error: {0}")]
    Core(#[from] WpysError),
}

impl ClientError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn job_not_found(job_id: impl Into<String>) -> Self {
        Self::JobNotFound { job_id: job_id.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Whether retrying the operation that produced this error is worthwhile.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClientError::ApiError { status, .. } => *status >= 500,
            ClientError::Core(err) => err.is_recoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_constructor() {
        let err = ClientError::api_error(400, "boom");
        assert_eq!(err.to_string(), "API error: 400 - boom");
    }

    #[test]
    fn server_api_errors_are_recoverable_client_errors_are_not() {
        assert!(ClientError::api_error(503, "unavailable").is_recoverable());
        assert!(!ClientError::api_error(400, "bad request").is_recoverable());
    }

    #[test]
    fn core_error_recoverability_passes_through() {
        assert!(ClientError::Core(WpysError::backend_error("reset")).is_recoverable());
        assert!(!ClientError::Core(WpysError::not_found("job-1")).is_recoverable());
    }
}
