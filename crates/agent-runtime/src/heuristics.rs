//! Give-up heuristics and recovery hints, evaluated over the action
//! history before each planning call.

use action_executor::ExecutionResult;

use crate::config::AgentConfig;

/// Whether the last `window` results all failed.
pub fn all_recent_failed(history: &[ExecutionResult], window: usize) -> bool {
    if window == 0 || history.len() < window {
        return false;
    }
    history[history.len() - window..]
        .iter()
        .all(|result| !result.success)
}

/// Whether the last `window` actions were identical in kind and
/// parameters (loop detection). Success flags are ignored: an agent
/// repeating the same successful action is just as stuck.
pub fn repeated_operation(history: &[ExecutionResult], window: usize) -> bool {
    if window == 0 || history.len() < window {
        return false;
    }
    let recent = &history[history.len() - window..];
    let first = &recent[0].action;
    recent[1..]
        .iter()
        .all(|result| result.action.same_operation(first))
}

/// Evaluate both give-up rules; returns the failure reason if one fires.
pub fn give_up_reason(history: &[ExecutionResult], config: &AgentConfig) -> Option<String> {
    if all_recent_failed(history, config.failure_window) {
        return Some(format!(
            "giving up: last {} actions all failed",
            config.failure_window
        ));
    }
    if repeated_operation(history, config.repeat_window) {
        return Some(format!(
            "giving up: last {} actions were identical (loop detected)",
            config.repeat_window
        ));
    }
    None
}

/// Advisory text appended to the next planning request when recent
/// failures show a recognizable pattern. Never alters control flow.
pub fn recovery_hint(history: &[ExecutionResult]) -> Option<String> {
    let recent_errors: Vec<&str> = history
        .iter()
        .rev()
        .take(3)
        .filter(|result| !result.success)
        .filter_map(|result| result.error.as_deref())
        .collect();
    if recent_errors.is_empty() {
        return None;
    }
    if recent_errors.iter().any(|error| error.contains("not found")) {
        return Some(
            "Recent attempts could not locate their target element; try a different selector \
             strategy or wait for the element to appear first."
                .to_string(),
        );
    }
    if recent_errors.iter().any(|error| error.contains("timeout")) {
        return Some(
            "Recent attempts timed out; the page may be slow. Consider waiting before the next \
             interaction."
                .to_string(),
        );
    }
    None
}
