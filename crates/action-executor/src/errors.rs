//! Error taxonomy for action execution.

use page_host::HostError;
use thiserror::Error;

/// Failure modes of a single action attempt.
#[derive(Debug, Error, Clone)]
pub enum ExecError {
    /// Malformed action parameters. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No locator candidate produced a usable element.
    #[error("element resolution failed: {0}")]
    Resolution(String),

    /// Page load, element wait, or script evaluation deadline exceeded.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Failure surfaced by the page host.
    #[error("host failure: {0}")]
    Host(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecError {
    /// Whether the retry loop may re-attempt after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExecError::Validation(_))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }
}

impl From<HostError> for ExecError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Timeout { .. } => ExecError::Timeout(err.to_string()),
            other => ExecError::Host(other.to_string()),
        }
    }
}
