//! Error taxonomy for retry operations
//!
//! [`AttemptError`] describes why a single attempt failed; the engine decides
//! from its [`ErrorClass`] whether to retry. [`RetryError`] is what the caller
//! of `execute` sees, and only ever carries the two terminal conditions.

use std::time::Duration;

use crate::classifier::ErrorClass;

/// Retry module result type
pub type Result<T> = std::result::Result<T, RetryError>;

/// Terminal failure of a retry operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    /// The caller cancelled the operation.
    #[error("Cancelled by user")]
    UserCancelled,

    /// The backend reported a condition retrying cannot fix (bad credentials,
    /// banned account). Carries the server-supplied message verbatim.
    #[error("{message}")]
    NonRetryable { message: String },
}

/// Why one attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    /// Connection refused, DNS failure, reset, ...
    #[error("network error: {0}")]
    Transport(String),

    /// The attempt did not finish within the per-attempt timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A response arrived with a non-2xx status.
    #[error("server returned HTTP {0}")]
    HttpStatus(u16),

    /// The body was not the expected JSON shape.
    #[error("invalid response: {0}")]
    Protocol(String),

    /// `status` reported failure and the message names a permanent condition.
    #[error("{0}")]
    NonRetryableBusiness(String),

    /// `status` reported any other failure.
    #[error("server reported failure: {0}")]
    GenericBusiness(String),
}

impl AttemptError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AttemptError::NonRetryableBusiness(_) => ErrorClass::Permanent,
            AttemptError::Transport(_)
            | AttemptError::Timeout(_)
            | AttemptError::HttpStatus(_)
            | AttemptError::Protocol(_)
            | AttemptError::GenericBusiness(_) => ErrorClass::Retryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Retryable)
    }

    /// Short line suitable for a status widget.
    pub fn reason(&self) -> String {
        match self {
            AttemptError::Transport(_) => "Network error".to_string(),
            AttemptError::Timeout(_) => "Request timeout".to_string(),
            AttemptError::HttpStatus(code) => format!("Server error ({code})"),
            AttemptError::Protocol(_) => "Invalid response format".to_string(),
            AttemptError::NonRetryableBusiness(message) => message.clone(),
            AttemptError::GenericBusiness(message) => message.clone(),
        }
    }
}
