//! Planning protocol: the request/response contract between the agent
//! loop and the external planning oracle.
//!
//! The oracle transport returns raw text; the parser here is tolerant of
//! surrounding formatting noise (code fences, prose) and degrades
//! contract violations to a zero-confidence non-achieving response that
//! the loop records as a planning failure instead of crashing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use action_executor::{Action, ExecutionResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AgentError;
use crate::types::{ContextSnapshot, Goal};

/// One planning request: everything the oracle needs to decide the next
/// action. The context screenshot doubles as the auxiliary visual input.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningRequest {
    pub goal: Goal,
    pub context: ContextSnapshot,
    pub history: Vec<ExecutionResult>,
    pub iteration: u32,
    /// Advisory recovery hint built from recent failures; never alters
    /// control flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Decoded planning response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningResponse {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub goal_achieved: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub action: Option<Action>,
}

impl PlanningResponse {
    /// Degraded response used for unparseable or contract-violating
    /// oracle output.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            reasoning: reason.into(),
            goal_achieved: false,
            confidence: 0.0,
            action: None,
        }
    }

    /// A response that neither achieves the goal nor carries an action
    /// violates the contract and counts as a planning failure.
    pub fn is_contract_violation(&self) -> bool {
        !self.goal_achieved && self.action.is_none()
    }
}

/// Decode raw oracle text into a [`PlanningResponse`].
///
/// Contract: if `goal_achieved` is true the action is ignored and
/// cleared; confidence is clamped into `[0, 1]`.
pub fn parse_response(raw: &str) -> PlanningResponse {
    let candidate = extract_json_object(raw).unwrap_or_else(|| raw.trim().to_string());
    match serde_json::from_str::<PlanningResponse>(&candidate) {
        Ok(mut response) => {
            response.confidence = response.confidence.clamp(0.0, 1.0);
            if response.goal_achieved {
                response.action = None;
            }
            response
        }
        Err(err) => {
            debug!(error = %err, "planning response failed to parse");
            PlanningResponse::degraded(format!("unparseable planning response: {}", err))
        }
    }
}

/// Extract the first balanced JSON object from noisy text (code fences,
/// leading prose, trailing commentary).
fn extract_json_object(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// External decision-maker mapping (goal, context, history) to raw
/// planning text.
#[async_trait]
pub trait PlanningOracle: Send + Sync {
    async fn decide(&self, request: &PlanningRequest) -> Result<String, AgentError>;
}

/// Scripted oracle for tests and offline development.
///
/// Responses queued with the `push_*` helpers are returned in FIFO
/// order; once the queue is empty the fallback response repeats forever.
pub struct MockOracle {
    queue: Mutex<VecDeque<String>>,
    fallback: String,
    calls: AtomicUsize,
}

impl MockOracle {
    /// Empty-queue oracle that keeps signalling goal achievement.
    pub fn new() -> Self {
        Self::with_fallback(
            r#"{"reasoning": "nothing left to do", "goal_achieved": true, "confidence": 1.0, "action": null}"#,
        )
    }

    /// Oracle whose exhausted queue repeats `fallback` forever.
    pub fn with_fallback(fallback: impl Into<String>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue one raw text response.
    pub fn push_raw(&self, raw: impl Into<String>) {
        self.queue.lock().push_back(raw.into());
    }

    /// Queue a well-formed response carrying `action`.
    pub fn push_action(&self, action: &Action) {
        let raw = serde_json::json!({
            "reasoning": "scripted action",
            "goal_achieved": false,
            "confidence": 0.9,
            "action": action,
        })
        .to_string();
        self.push_raw(raw);
    }

    /// Queue a goal-achieved response.
    pub fn push_achieved(&self, reasoning: &str) {
        let raw = serde_json::json!({
            "reasoning": reasoning,
            "goal_achieved": true,
            "confidence": 1.0,
            "action": null,
        })
        .to_string();
        self.push_raw(raw);
    }

    /// Number of decide calls received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlanningOracle for MockOracle {
    async fn decide(&self, _request: &PlanningRequest) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queue.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}
