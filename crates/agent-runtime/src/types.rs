//! Agent state, goal, and page-observation types.

use action_executor::{Action, ExecutionResult};
use chrono::{DateTime, Utc};
use pagepilot_core_types::{GoalId, TabId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User-supplied natural-language objective bound to one tab.
/// Created once per agent; immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub text: String,
    pub target_tab: TabId,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(text: impl Into<String>, target_tab: TabId) -> Self {
        Self {
            id: GoalId::new(),
            text: text.into(),
            target_tab,
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle status of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Created,
    Planning,
    Executing,
    Paused,
    Completed,
    Failed,
    Stopped,
}

impl AgentStatus {
    /// Terminal statuses are absorbing: no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentStatus::Completed | AgentStatus::Failed | AgentStatus::Stopped
        )
    }

    /// Whether a loop task is currently allowed to run for this status.
    pub fn is_active(&self) -> bool {
        matches!(self, AgentStatus::Planning | AgentStatus::Executing)
    }
}

/// The page observation captured once per iteration.
///
/// Replaced, never accumulated: only the current snapshot is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Simplified interactive-element summary for the oracle.
    pub dom_summary: String,
    pub page_text: String,
    pub timestamp: DateTime<Utc>,
}

/// Full mutable state of one agent, owned exclusively by its loop task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub goal: Goal,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_context: Option<ContextSnapshot>,
    pub action_history: Vec<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_action: Option<Action>,
    pub iteration: u32,
    pub max_iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl AgentState {
    pub fn new(goal: Goal, max_iterations: u32) -> Self {
        Self {
            goal,
            status: AgentStatus::Created,
            current_context: None,
            action_history: Vec::new(),
            current_action: None,
            iteration: 0,
            max_iterations,
            error: None,
            started_at: None,
            completed_at: None,
            result: None,
        }
    }

    /// The successful-action subsequence of the history, in order.
    /// Used by persistence collaborators to build skills.
    pub fn successful_actions(&self) -> Vec<Action> {
        self.action_history
            .iter()
            .filter(|result| result.success)
            .map(|result| result.action.clone())
            .collect()
    }

    /// Terminal statuses are absorbing; a `stop` that lands mid-pass
    /// wins over the pass outcome.
    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = AgentStatus::Failed;
        self.error = Some(reason.into());
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn complete(&mut self, result: Option<Value>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = AgentStatus::Completed;
        self.result = result;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_executor::ActionKind;

    fn result(success: bool, selector: &str) -> ExecutionResult {
        let action = Action::new(ActionKind::Click {
            selector: selector.to_string(),
            selectors: None,
        });
        if success {
            ExecutionResult::succeeded(action, None, None, 1)
        } else {
            ExecutionResult::failed(action, "nope", 1)
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(AgentStatus::Completed.is_terminal());
        assert!(AgentStatus::Failed.is_terminal());
        assert!(AgentStatus::Stopped.is_terminal());
        assert!(!AgentStatus::Paused.is_terminal());
        assert!(!AgentStatus::Created.is_terminal());
    }

    #[test]
    fn test_successful_actions_preserve_order() {
        let mut state = AgentState::new(Goal::new("test", TabId::new()), 50);
        state.action_history.push(result(true, "#a"));
        state.action_history.push(result(false, "#b"));
        state.action_history.push(result(true, "#c"));

        let actions = state.successful_actions();
        assert_eq!(actions.len(), 2);
        match (&actions[0].kind, &actions[1].kind) {
            (
                ActionKind::Click { selector: first, .. },
                ActionKind::Click { selector: second, .. },
            ) => {
                assert_eq!(first, "#a");
                assert_eq!(second, "#c");
            }
            other => panic!("unexpected kinds: {:?}", other),
        }
    }
}
