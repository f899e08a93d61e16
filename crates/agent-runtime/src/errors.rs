//! Errors emitted by the agent runtime.

use pagepilot_core_types::{AgentId, TabId};
use thiserror::Error;

use crate::types::AgentStatus;

/// Errors raised by lifecycle operations.
///
/// Only lifecycle misuse surfaces synchronously; failures inside an
/// iteration are recorded in the agent's history and never thrown.
#[derive(Debug, Error, Clone)]
pub enum AgentError {
    /// The requested operation is illegal in the agent's current status.
    #[error("invalid state transition: cannot {operation} an agent in status {status:?}")]
    InvalidStateTransition {
        operation: &'static str,
        status: AgentStatus,
    },

    /// No agent registered under this id.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// Another active agent is already driving the target tab.
    #[error("tab {0} is already driven by an active agent")]
    TabBusy(TabId),

    /// Transport failure while calling the planning oracle.
    #[error("planning oracle failure: {0}")]
    Oracle(String),
}

impl AgentError {
    pub fn invalid_transition(operation: &'static str, status: AgentStatus) -> Self {
        Self::InvalidStateTransition { operation, status }
    }
}
