//! Error taxonomy surfaced by page host implementations.

use pagepilot_core_types::TabId;
use thiserror::Error;

/// Errors raised by a [`crate::PageHost`] implementation.
#[derive(Debug, Error, Clone)]
pub enum HostError {
    /// Navigation failed or the page never finished loading.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// In-page script evaluation threw or returned a non-JSON value.
    #[error("script execution failed: {0}")]
    Script(String),

    /// Screenshot capture failed.
    #[error("screenshot capture failed: {0}")]
    Screenshot(String),

    /// The referenced tab does not exist (closed or never created).
    #[error("tab not found: {0}")]
    TabNotFound(TabId),

    /// A host-side operation exceeded its deadline.
    #[error("host operation timed out after {elapsed_ms}ms: {operation}")]
    Timeout { operation: String, elapsed_ms: u64 },

    /// Any other failure surfaced by the host process.
    #[error("host error: {0}")]
    Other(String),
}

impl HostError {
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        Self::Navigation(message.into())
    }

    pub fn timeout(operation: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_ms,
        }
    }
}
