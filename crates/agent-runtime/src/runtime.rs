//! Agent registry and the observe-decide-act iteration loop.

use std::sync::Arc;

use action_executor::{Action, ActionExecutor, ActionKind, ExecutionResult, ExecutorConfig};
use chrono::Utc;
use dashmap::DashMap;
use page_host::PageHost;
use pagepilot_core_types::{AgentId, TabId};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::errors::AgentError;
use crate::heuristics;
use crate::oracle::{parse_response, PlanningOracle, PlanningRequest};
use crate::types::{AgentState, AgentStatus, ContextSnapshot, Goal};

/// Interactive-element summary captured once per iteration for the
/// oracle. The exact format is presentation detail, not contract.
const DOM_SUMMARY_JS: &str = r#"
(() => {
  const parts = [];
  let index = 0;
  for (const el of document.querySelectorAll('a, button, input, select, textarea, [role]')) {
    if (index >= 100) break;
    const text = (el.textContent || el.value || '').trim().slice(0, 80);
    parts.push('[' + (index++) + '] <' + el.tagName.toLowerCase() + '> ' + text);
  }
  return { ok: true, data: parts.join('\n') };
})();
"#;

/// Outcome of one loop pass.
enum PassOutcome {
    /// The agent reached a terminal status during the pass.
    Done,
    /// Keep iterating.
    Continue,
}

/// One registered agent: its state plus the loop task driving it.
///
/// `task` doubles as the launch lock: `start`/`resume` hold it while
/// waiting for a previous loop task to park, so at most one task ever
/// drives the agent.
struct AgentSlot {
    state: Mutex<AgentState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Explicit registry of agents keyed by opaque id.
///
/// There is no ambient singleton: callers hold the runtime and pass it
/// wherever lookup is needed. Each agent's state is owned by its own
/// loop task (single writer); lifecycle operations and read accessors
/// take the per-agent lock briefly.
pub struct AgentRuntime {
    host: Arc<dyn PageHost>,
    oracle: Arc<dyn PlanningOracle>,
    executor: Arc<ActionExecutor>,
    config: AgentConfig,
    agents: DashMap<AgentId, Arc<AgentSlot>>,
}

impl AgentRuntime {
    pub fn new(host: Arc<dyn PageHost>, oracle: Arc<dyn PlanningOracle>, config: AgentConfig) -> Self {
        Self::with_executor_config(host, oracle, config, ExecutorConfig::default())
    }

    /// Construct with an explicit executor configuration (retry budget,
    /// settle delays, screenshot capture).
    pub fn with_executor_config(
        host: Arc<dyn PageHost>,
        oracle: Arc<dyn PlanningOracle>,
        config: AgentConfig,
        executor_config: ExecutorConfig,
    ) -> Self {
        let executor = Arc::new(ActionExecutor::new(host.clone(), executor_config));
        Self {
            host,
            oracle,
            executor,
            config,
            agents: DashMap::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Direct access to the action executor (the `executeAction` entry
    /// point exposed to IPC collaborators).
    pub fn executor(&self) -> Arc<ActionExecutor> {
        self.executor.clone()
    }

    /// Create a new agent in `created` status. Always succeeds.
    pub fn create(&self, goal_text: impl Into<String>, tab: TabId) -> AgentId {
        let id = AgentId::new();
        let goal = Goal::new(goal_text, tab);
        let state = AgentState::new(goal, self.config.max_iterations);
        self.agents.insert(
            id.clone(),
            Arc::new(AgentSlot {
                state: Mutex::new(state),
                task: Mutex::new(None),
            }),
        );
        info!(agent = %id, "agent created");
        id
    }

    /// Start a created agent or resume a paused one, launching the
    /// iteration loop as an independent task.
    pub async fn start(self: &Arc<Self>, id: &AgentId) -> Result<(), AgentError> {
        self.launch(id, "start", &[AgentStatus::Created, AgentStatus::Paused])
            .await
    }

    /// Resume a paused agent. If the pause landed mid-pass, this waits
    /// for the in-flight pass to complete and the old loop task to park
    /// before the loop runs again.
    pub async fn resume(self: &Arc<Self>, id: &AgentId) -> Result<(), AgentError> {
        self.launch(id, "resume", &[AgentStatus::Paused]).await
    }

    async fn launch(
        self: &Arc<Self>,
        id: &AgentId,
        operation: &'static str,
        allowed: &[AgentStatus],
    ) -> Result<(), AgentError> {
        let slot = self.slot(id)?;

        // Precheck outside the task lock so resuming a running agent
        // errors instead of waiting on a task that never parks.
        {
            let state = slot.state.lock().await;
            if !allowed.contains(&state.status) {
                return Err(AgentError::invalid_transition(operation, state.status));
            }
        }

        // One launcher at a time. A paused agent's old loop task parks
        // once its in-flight pass completes; wait for that before
        // spawning a replacement so exactly one task drives the agent.
        let mut task = slot.task.lock().await;
        if let Some(previous) = task.take() {
            let _ = previous.await;
        }

        // Two loops against one tab would interleave writes; refuse.
        let target_tab = { slot.state.lock().await.goal.target_tab.clone() };
        if self.tab_busy(id, &target_tab).await {
            return Err(AgentError::TabBusy(target_tab));
        }

        {
            let mut state = slot.state.lock().await;
            if !allowed.contains(&state.status) {
                return Err(AgentError::invalid_transition(operation, state.status));
            }
            state.status = AgentStatus::Planning;
            if state.started_at.is_none() {
                state.started_at = Some(Utc::now());
            }
        }

        let runtime = Arc::clone(self);
        let agent_id = id.clone();
        let loop_slot = slot.clone();
        *task = Some(tokio::spawn(async move {
            runtime.run_loop(agent_id, loop_slot).await;
        }));
        Ok(())
    }

    /// Pause a running agent; the in-flight iteration finishes naturally
    /// before the loop observes the new status.
    pub async fn pause(&self, id: &AgentId) -> Result<(), AgentError> {
        let slot = self.slot(id)?;
        let mut state = slot.state.lock().await;
        if !state.status.is_active() {
            return Err(AgentError::invalid_transition("pause", state.status));
        }
        state.status = AgentStatus::Paused;
        info!(agent = %id, "agent paused");
        Ok(())
    }

    /// Stop an agent from any non-terminal status.
    pub async fn stop(&self, id: &AgentId) -> Result<(), AgentError> {
        let slot = self.slot(id)?;
        let mut state = slot.state.lock().await;
        if state.status.is_terminal() {
            return Err(AgentError::invalid_transition("stop", state.status));
        }
        state.status = AgentStatus::Stopped;
        state.completed_at = Some(Utc::now());
        info!(agent = %id, "agent stopped");
        Ok(())
    }

    /// Current status of one agent.
    pub async fn status(&self, id: &AgentId) -> Result<AgentStatus, AgentError> {
        Ok(self.slot(id)?.state.lock().await.status)
    }

    /// Full state clone for presentation and persistence collaborators.
    pub async fn snapshot(&self, id: &AgentId) -> Result<AgentState, AgentError> {
        Ok(self.slot(id)?.state.lock().await.clone())
    }

    /// The successful-action subsequence of an agent's history, used for
    /// skill creation.
    pub async fn successful_actions(&self, id: &AgentId) -> Result<Vec<Action>, AgentError> {
        Ok(self.slot(id)?.state.lock().await.successful_actions())
    }

    /// Ids and statuses of every registered agent.
    pub async fn list_all(&self) -> Vec<(AgentId, AgentStatus)> {
        let mut agents = Vec::new();
        for entry in self.agents.iter() {
            let status = entry.value().state.lock().await.status;
            agents.push((entry.key().clone(), status));
        }
        agents
    }

    /// Ids of agents whose loops are currently running.
    pub async fn list_active(&self) -> Vec<AgentId> {
        self.list_all()
            .await
            .into_iter()
            .filter(|(_, status)| status.is_active())
            .map(|(id, _)| id)
            .collect()
    }

    fn slot(&self, id: &AgentId) -> Result<Arc<AgentSlot>, AgentError> {
        self.agents
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AgentError::UnknownAgent(id.clone()))
    }

    async fn tab_busy(&self, candidate: &AgentId, tab: &TabId) -> bool {
        for entry in self.agents.iter() {
            if entry.key() == candidate {
                continue;
            }
            let state = entry.value().state.lock().await;
            if &state.goal.target_tab == tab && state.status.is_active() {
                return true;
            }
        }
        false
    }

    /// The iteration loop. One task per agent; strictly sequential
    /// passes. Pause/stop are observed only here, at loop-top.
    async fn run_loop(self: Arc<Self>, id: AgentId, slot: Arc<AgentSlot>) {
        info!(agent = %id, "agent loop running");
        loop {
            let (goal, iteration) = {
                let mut state = slot.state.lock().await;
                if state.status == AgentStatus::Paused {
                    info!(agent = %id, "loop observed pause");
                    break;
                }
                if state.status.is_terminal() {
                    break;
                }
                if state.iteration >= state.max_iterations {
                    let max = state.max_iterations;
                    warn!(agent = %id, max, "iteration budget exhausted");
                    state.fail(format!("maximum iterations reached ({})", max));
                    break;
                }
                if let Some(reason) =
                    heuristics::give_up_reason(&state.action_history, &self.config)
                {
                    warn!(agent = %id, reason = %reason, "give-up heuristic fired");
                    state.fail(reason);
                    break;
                }
                state.status = AgentStatus::Planning;
                state.iteration += 1;
                (state.goal.clone(), state.iteration)
            };

            match self.run_pass(&slot, &goal, iteration).await {
                Ok(PassOutcome::Done) => break,
                Ok(PassOutcome::Continue) => {
                    if self.config.inter_action_delay_ms > 0 {
                        sleep(Duration::from_millis(self.config.inter_action_delay_ms)).await;
                    }
                }
                Err(message) => {
                    // Never crash the agent: record the pass error
                    // against the in-flight action (or a synthetic
                    // placeholder) and cool down before continuing.
                    warn!(agent = %id, error = %message, "iteration pass errored");
                    {
                        let mut state = slot.state.lock().await;
                        let result = match state.current_action.take() {
                            Some(action) => ExecutionResult::failed(action, message.clone(), 0),
                            None => synthetic_failure(message.clone()),
                        };
                        state.action_history.push(result);
                    }
                    if self.config.error_cooldown_ms > 0 {
                        sleep(Duration::from_millis(self.config.error_cooldown_ms)).await;
                    }
                }
            }
        }
        info!(agent = %id, "agent loop exited");
    }

    /// One observe-decide-act pass.
    async fn run_pass(
        &self,
        slot: &Arc<AgentSlot>,
        goal: &Goal,
        iteration: u32,
    ) -> Result<PassOutcome, String> {
        // Observe: fresh context snapshot, replacing the previous one.
        let context = self.capture_context(&goal.target_tab).await?;
        let request = {
            let mut state = slot.state.lock().await;
            state.current_context = Some(context.clone());
            PlanningRequest {
                goal: goal.clone(),
                context,
                history: state.action_history.clone(),
                iteration,
                hint: heuristics::recovery_hint(&state.action_history),
            }
        };

        // Decide.
        let raw = self
            .oracle
            .decide(&request)
            .await
            .map_err(|err| err.to_string())?;
        let response = parse_response(&raw);

        if response.goal_achieved {
            info!(goal = %goal.id, confidence = response.confidence, "oracle signalled goal achieved");
            let mut state = slot.state.lock().await;
            state.complete(Some(json!({
                "reason": response.reasoning,
                "confidence": response.confidence,
            })));
            return Ok(PassOutcome::Done);
        }

        let Some(action) = response.action else {
            // Contract violation: recorded as a planning failure for
            // this iteration; the loop continues.
            warn!(goal = %goal.id, "planning response carried no action");
            let mut state = slot.state.lock().await;
            state.action_history.push(synthetic_failure(format!(
                "planning failure: {}",
                response.reasoning
            )));
            return Ok(PassOutcome::Continue);
        };

        // Act.
        {
            let mut state = slot.state.lock().await;
            if state.status == AgentStatus::Planning {
                state.status = AgentStatus::Executing;
            }
            state.current_action = Some(action.clone());
        }

        debug!(kind = action.kind.name(), iteration, "executing planned action");
        let result = self.executor.execute(&action, &goal.target_tab).await;
        let reached_complete =
            result.success && matches!(action.kind, ActionKind::Complete { .. });
        let payload = result.data.clone();

        let mut state = slot.state.lock().await;
        state.current_action = None;
        state.action_history.push(result);
        if reached_complete {
            state.complete(payload);
            return Ok(PassOutcome::Done);
        }
        Ok(PassOutcome::Continue)
    }

    /// Capture the page observation for this iteration. URL and title
    /// are required; screenshot, text, and the DOM summary degrade
    /// silently.
    async fn capture_context(&self, tab: &TabId) -> Result<ContextSnapshot, String> {
        let url = self
            .host
            .url(tab)
            .await
            .map_err(|err| format!("context capture failed: {}", err))?;
        let title = self
            .host
            .title(tab)
            .await
            .map_err(|err| format!("context capture failed: {}", err))?;
        let screenshot = if self.config.capture_context_screenshots {
            self.host.screenshot(tab).await.ok()
        } else {
            None
        };
        let page_text = self.host.page_text(tab).await.unwrap_or_default();
        let dom_summary = match self.host.run_script(tab, DOM_SUMMARY_JS).await {
            Ok(value) => value
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Err(err) => {
                debug!(error = %err, "dom summary capture degraded to empty");
                String::new()
            }
        };
        Ok(ContextSnapshot {
            url,
            title,
            screenshot,
            dom_summary,
            page_text,
            timestamp: Utc::now(),
        })
    }
}

/// Failure record for a pass where no planned action was in flight.
fn synthetic_failure(message: String) -> ExecutionResult {
    let action = Action::new(ActionKind::Wait { duration_ms: 0 }).with_reasoning(message.clone());
    ExecutionResult::failed(action, message, 0)
}
