//! Deterministic replay over a fixed action list.

use std::sync::Arc;
use std::time::Instant;

use action_executor::{Action, ActionExecutor, ActionKind, ExecutionResult};
use page_host::PageHost;
use pagepilot_core_types::TabId;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::model::Skill;

/// Per-replay knobs.
#[derive(Clone, Debug)]
pub struct ReplayOptions {
    /// Keep executing after a failed action. The overall outcome is
    /// then reported as a success (the caller accepted partial
    /// failure), with the last error still surfaced.
    pub continue_on_error: bool,
    /// Navigate here and settle before the first action.
    pub start_url: Option<String>,
    /// Fixed delay between actions, matching the agent loop's pacing.
    pub inter_action_delay_ms: u64,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            start_url: None,
            inter_action_delay_ms: 1_000,
        }
    }
}

impl ReplayOptions {
    /// Delay-free preset for tests and dry runs.
    pub fn minimal() -> Self {
        Self {
            continue_on_error: false,
            start_url: None,
            inter_action_delay_ms: 0,
        }
    }

    pub fn continue_on_error(mut self, yes: bool) -> Self {
        self.continue_on_error = yes;
        self
    }

    pub fn start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = Some(url.into());
        self
    }
}

/// What a replay produced.
#[derive(Clone, Debug)]
pub struct ReplayOutcome {
    pub success: bool,
    pub executed: Vec<ExecutionResult>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Drives the action executor over a stored list, strictly in order,
/// with no planning involved.
pub struct ReplayEngine {
    executor: Arc<ActionExecutor>,
}

impl ReplayEngine {
    pub fn new(executor: Arc<ActionExecutor>) -> Self {
        Self { executor }
    }

    pub fn with_host(host: Arc<dyn PageHost>) -> Self {
        Self::new(Arc::new(ActionExecutor::new(
            host,
            action_executor::ExecutorConfig::minimal(),
        )))
    }

    /// Replay `actions` against `tab`. Every executed action's result is
    /// recorded; a failing start-URL navigation aborts before the first
    /// action.
    pub async fn replay(
        &self,
        actions: &[Action],
        tab: &TabId,
        options: &ReplayOptions,
    ) -> ReplayOutcome {
        let started = Instant::now();
        info!(actions = actions.len(), "replay started");

        if let Some(url) = &options.start_url {
            let nav = Action::new(ActionKind::Navigate { url: url.clone() });
            let result = self.executor.execute(&nav, tab).await;
            if !result.success {
                warn!(url = %url, "start navigation failed, replay aborted");
                return ReplayOutcome {
                    success: false,
                    executed: Vec::new(),
                    error: result.error,
                    duration_ms: started.elapsed().as_millis() as u64,
                };
            }
        }

        let mut executed = Vec::with_capacity(actions.len());
        let mut last_error = None;
        let mut success = true;

        for (index, action) in actions.iter().enumerate() {
            debug!(index, kind = action.kind.name(), "replaying action");
            let result = self.executor.execute(action, tab).await;
            let failed = !result.success;
            if failed {
                last_error = result.error.clone();
            }
            executed.push(result);

            if failed && !options.continue_on_error {
                success = false;
                break;
            }
            if index + 1 < actions.len() && options.inter_action_delay_ms > 0 {
                sleep(Duration::from_millis(options.inter_action_delay_ms)).await;
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            executed = executed.len(),
            success, duration_ms, "replay finished"
        );
        ReplayOutcome {
            success,
            executed,
            error: last_error,
            duration_ms,
        }
    }

    /// Replay a stored skill, honoring its declared start URL unless the
    /// options carry an override. Usage bookkeeping stays with the
    /// caller.
    pub async fn replay_skill(
        &self,
        skill: &Skill,
        tab: &TabId,
        options: &ReplayOptions,
    ) -> ReplayOutcome {
        let mut effective = options.clone();
        if effective.start_url.is_none() {
            effective.start_url = skill.context.start_url.clone();
        }
        self.replay(&skill.actions, tab, &effective).await
    }
}
