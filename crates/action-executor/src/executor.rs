//! The action executor: validation, retry loop, and per-kind dispatch.

use std::sync::Arc;
use std::time::Instant;

use page_host::PageHost;
use pagepilot_core_types::TabId;
use rand::Rng;
use serde_json::{json, Map, Value};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::errors::ExecError;
use crate::locator::{self, NormalizedSelector};
use crate::types::{Action, ActionKind, ExecutionResult, ScrollDirection};
use crate::validate;

/// Tunables for action execution.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Retries after the first failed attempt (total attempts = retries + 1).
    pub max_retries: u32,
    /// Fixed backoff between attempts.
    pub retry_delay_ms: u64,
    /// Deadline for the post-navigate load wait.
    pub page_load_timeout_ms: u64,
    /// Settle delay between scroll-into-view and the click itself, so
    /// scroll-triggered lazy content can appear.
    pub click_settle_ms: u64,
    /// Settle delay after tab create/switch/close.
    pub tab_settle_ms: u64,
    /// Poll interval for load/element waits.
    pub poll_interval_ms: u64,
    /// Default timeout for wait_for_element when the action carries none.
    pub element_wait_ms: u64,
    /// Relative scroll distance when the action carries no amount.
    pub default_scroll_px: i64,
    /// Per-character typing delay bounds (randomized per character).
    pub typing_delay_min_ms: u64,
    pub typing_delay_max_ms: u64,
    /// Capture a best-effort screenshot after successful mutating actions.
    pub capture_screenshots: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1_000,
            page_load_timeout_ms: 10_000,
            click_settle_ms: 300,
            tab_settle_ms: 500,
            poll_interval_ms: 100,
            element_wait_ms: 10_000,
            default_scroll_px: 300,
            typing_delay_min_ms: 30,
            typing_delay_max_ms: 80,
            capture_screenshots: false,
        }
    }
}

impl ExecutorConfig {
    /// Delay-free preset for tests.
    pub fn minimal() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 0,
            page_load_timeout_ms: 200,
            click_settle_ms: 0,
            tab_settle_ms: 0,
            poll_interval_ms: 1,
            element_wait_ms: 50,
            default_scroll_px: 300,
            typing_delay_min_ms: 0,
            typing_delay_max_ms: 0,
            capture_screenshots: false,
        }
    }

    /// Builder: set the retry budget.
    pub fn retries(mut self, count: u32) -> Self {
        self.max_retries = count;
        self
    }

    /// Builder: toggle post-action screenshots.
    pub fn screenshots(mut self, enabled: bool) -> Self {
        self.capture_screenshots = enabled;
        self
    }
}

/// Element operation applied through the locator fallback chain.
enum ElementOp<'a> {
    Click,
    Type { text: &'a str, clear: bool },
}

/// Executes one action against the page host.
///
/// Never returns an error: every call produces exactly one
/// [`ExecutionResult`], after all internal retries are exhausted or one
/// attempt succeeds. Intermediate retry failures are logged but not
/// surfaced as separate results.
pub struct ActionExecutor {
    host: Arc<dyn PageHost>,
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(host: Arc<dyn PageHost>, config: ExecutorConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn host(&self) -> Arc<dyn PageHost> {
        self.host.clone()
    }

    /// Execute one action with validation and bounded retries.
    pub async fn execute(&self, action: &Action, tab: &TabId) -> ExecutionResult {
        let started = Instant::now();

        if let Err(err) = validate::validate(&action.kind) {
            debug!(kind = action.kind.name(), error = %err, "validation rejected action");
            return ExecutionResult::failed(
                action.clone(),
                err.to_string(),
                started.elapsed().as_millis() as u64,
            );
        }

        let retry_allowed = !matches!(action.kind, ActionKind::Complete { .. });
        let mut attempt: u32 = 0;

        loop {
            match self.dispatch(&action.kind, tab).await {
                Ok(data) => {
                    let screenshot = self.maybe_screenshot(&action.kind, tab).await;
                    let elapsed = started.elapsed().as_millis() as u64;
                    info!(
                        kind = action.kind.name(),
                        attempt,
                        duration_ms = elapsed,
                        "action succeeded"
                    );
                    return ExecutionResult::succeeded(action.clone(), data, screenshot, elapsed);
                }
                Err(err) => {
                    let exhausted = attempt >= self.config.max_retries;
                    if !retry_allowed || !err.is_retryable() || exhausted {
                        let elapsed = started.elapsed().as_millis() as u64;
                        warn!(
                            kind = action.kind.name(),
                            attempts = attempt + 1,
                            error = %err,
                            "action failed"
                        );
                        return ExecutionResult::failed(action.clone(), err.to_string(), elapsed);
                    }
                    attempt += 1;
                    warn!(
                        kind = action.kind.name(),
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %err,
                        "action attempt failed, retrying"
                    );
                    if self.config.retry_delay_ms > 0 {
                        sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    }
                }
            }
        }
    }

    /// One full attempt at the action. Exhaustive over every kind.
    async fn dispatch(&self, kind: &ActionKind, tab: &TabId) -> Result<Option<Value>, ExecError> {
        match kind {
            ActionKind::Navigate { url } => {
                let target = validate::normalize_url(url)?;
                self.host.navigate(tab, &target).await?;
                self.wait_for_load(tab).await?;
                Ok(None)
            }
            ActionKind::GoBack => {
                self.host.go_back(tab).await?;
                self.settle(self.config.tab_settle_ms).await;
                Ok(None)
            }
            ActionKind::GoForward => {
                self.host.go_forward(tab).await?;
                self.settle(self.config.tab_settle_ms).await;
                Ok(None)
            }
            ActionKind::Reload => {
                self.host.reload(tab).await?;
                self.wait_for_load(tab).await?;
                Ok(None)
            }
            ActionKind::Click {
                selector,
                selectors,
            } => {
                let groups = locator::candidate_groups(selector, selectors.as_deref());
                self.run_element_op(tab, groups, ElementOp::Click).await
            }
            ActionKind::Type {
                selector,
                selectors,
                text,
                clear,
            } => {
                let groups = locator::candidate_groups(selector, selectors.as_deref());
                self.run_element_op(
                    tab,
                    groups,
                    ElementOp::Type {
                        text,
                        clear: *clear,
                    },
                )
                .await
            }
            ActionKind::Select { selector, value } => {
                let sel = locator::normalize(selector);
                self.run_script(tab, &locator::select_script(&sel, value))
                    .await
            }
            ActionKind::Scroll { direction, amount } => {
                self.run_script(
                    tab,
                    &locator::scroll_script(*direction, *amount, self.config.default_scroll_px),
                )
                .await
            }
            ActionKind::Hover { selector } => {
                let sel = locator::normalize(selector);
                self.run_script(tab, &locator::hover_script(&sel)).await
            }
            ActionKind::Extract { schema } => {
                let mut extracted = Map::new();
                for (field_name, field) in schema {
                    let script = locator::extract_field_script(field);
                    // A failing field degrades to empty instead of
                    // failing the whole extraction.
                    let value = match self.run_script(tab, &script).await {
                        Ok(Some(value)) => value,
                        Ok(None) => Value::Null,
                        Err(err) => {
                            debug!(field = %field_name, error = %err, "extract field degraded to empty");
                            if field.multiple {
                                Value::Array(Vec::new())
                            } else {
                                Value::Null
                            }
                        }
                    };
                    extracted.insert(field_name.clone(), value);
                }
                Ok(Some(Value::Object(extracted)))
            }
            ActionKind::GetText { selector } => {
                let sel = locator::normalize(selector);
                self.run_script(tab, &locator::get_text_script(&sel)).await
            }
            ActionKind::GetAttribute {
                selector,
                attribute,
            } => {
                let sel = locator::normalize(selector);
                self.run_script(tab, &locator::get_attribute_script(&sel, attribute))
                    .await
            }
            ActionKind::Wait { duration_ms } => {
                sleep(Duration::from_millis(*duration_ms)).await;
                Ok(None)
            }
            ActionKind::WaitForElement {
                selector,
                timeout_ms,
            } => {
                let sel = locator::normalize(selector);
                let timeout = timeout_ms.unwrap_or(self.config.element_wait_ms);
                self.wait_for_element(tab, &sel, timeout).await?;
                Ok(None)
            }
            ActionKind::CreateTab { url } => {
                let created = self.host.create_tab(url.as_deref()).await?;
                self.settle(self.config.tab_settle_ms).await;
                Ok(Some(json!({ "tab_id": created.0 })))
            }
            ActionKind::SwitchTab { tab_id } => {
                if !self.host.switch_tab(tab_id).await? {
                    return Err(ExecError::Host(format!("tab not found: {}", tab_id)));
                }
                self.settle(self.config.tab_settle_ms).await;
                Ok(None)
            }
            ActionKind::CloseTab { tab_id } => {
                if !self.host.close_tab(tab_id).await? {
                    return Err(ExecError::Host(format!("tab not found: {}", tab_id)));
                }
                self.settle(self.config.tab_settle_ms).await;
                Ok(None)
            }
            ActionKind::Complete { reason, data } => {
                // Terminal no-op; the payload becomes the agent's result.
                Ok(Some(json!({ "reason": reason, "data": data })))
            }
        }
    }

    /// Try candidates group by group; the first candidate whose
    /// operation succeeds wins and all later groups are skipped.
    async fn run_element_op(
        &self,
        tab: &TabId,
        groups: Vec<Vec<String>>,
        op: ElementOp<'_>,
    ) -> Result<Option<Value>, ExecError> {
        let mut last_error = None;
        for (group_index, group) in groups.iter().enumerate() {
            for candidate in group {
                let sel = locator::normalize(candidate);
                match self.try_candidate(tab, &sel, &op).await {
                    Ok(data) => {
                        debug!(
                            group = group_index,
                            candidate = %candidate,
                            "locator candidate succeeded"
                        );
                        return Ok(data);
                    }
                    Err(err) => {
                        warn!(
                            group = group_index,
                            candidate = %candidate,
                            error = %err,
                            "locator candidate failed"
                        );
                        last_error = Some(err);
                    }
                }
            }
        }
        Err(match last_error {
            Some(err) => ExecError::resolution(format!(
                "all selector strategies failed (last: {})",
                err
            )),
            None => ExecError::resolution("all selector strategies failed"),
        })
    }

    async fn try_candidate(
        &self,
        tab: &TabId,
        sel: &NormalizedSelector,
        op: &ElementOp<'_>,
    ) -> Result<Option<Value>, ExecError> {
        match op {
            ElementOp::Click => {
                self.run_script(tab, &locator::locate_script(sel)).await?;
                // Let scroll-triggered lazy content appear before clicking.
                self.settle(self.config.click_settle_ms).await;
                self.run_script(tab, &locator::click_script(sel)).await
            }
            ElementOp::Type { text, clear } => {
                self.run_script(tab, &locator::focus_script(sel, *clear))
                    .await?;
                for ch in text.chars() {
                    self.run_script(tab, &locator::type_char_script(sel, ch))
                        .await?;
                    let delay = self.typing_delay();
                    if delay > 0 {
                        sleep(Duration::from_millis(delay)).await;
                    }
                }
                self.run_script(tab, &locator::finish_typing_script(sel))
                    .await
            }
        }
    }

    fn typing_delay(&self) -> u64 {
        let min = self.config.typing_delay_min_ms;
        let max = self.config.typing_delay_max_ms.max(min);
        if max == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(min..=max)
    }

    /// Run a script and decode its `{ok, error?, data?}` envelope.
    async fn run_script(&self, tab: &TabId, code: &str) -> Result<Option<Value>, ExecError> {
        let value = self.host.run_script(tab, code).await?;
        script_outcome(value)
    }

    /// Poll document readiness until complete or the load deadline.
    async fn wait_for_load(&self, tab: &TabId) -> Result<(), ExecError> {
        let deadline = Instant::now() + Duration::from_millis(self.config.page_load_timeout_ms);
        let script = locator::ready_state_script();
        loop {
            let value = self.host.run_script(tab, &script).await?;
            if value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ExecError::Timeout(format!(
                    "page did not finish loading within {}ms",
                    self.config.page_load_timeout_ms
                )));
            }
            sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    /// Poll for element presence until found or the timeout elapses.
    async fn wait_for_element(
        &self,
        tab: &TabId,
        sel: &NormalizedSelector,
        timeout_ms: u64,
    ) -> Result<(), ExecError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let script = locator::exists_script(sel);
        loop {
            let value = self.host.run_script(tab, &script).await?;
            if value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ExecError::Timeout(format!(
                    "element did not appear within {}ms",
                    timeout_ms
                )));
            }
            sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    /// Best-effort screenshot after a successful mutating action.
    async fn maybe_screenshot(&self, kind: &ActionKind, tab: &TabId) -> Option<String> {
        if !self.config.capture_screenshots || !kind.is_mutating() {
            return None;
        }
        match self.host.screenshot(tab).await {
            Ok(image) => Some(image),
            Err(err) => {
                debug!(error = %err, "post-action screenshot failed");
                None
            }
        }
    }

    async fn settle(&self, ms: u64) {
        if ms > 0 {
            sleep(Duration::from_millis(ms)).await;
        }
    }
}

/// Decode the `{ok, error?, data?}` envelope emitted by page scripts.
/// Raw non-object values pass through as data.
fn script_outcome(value: Value) -> Result<Option<Value>, ExecError> {
    match value {
        Value::Object(map) if map.contains_key("ok") => {
            let ok = map.get("ok").and_then(Value::as_bool).unwrap_or(false);
            if ok {
                Ok(map.get("data").cloned().filter(|data| !data.is_null()))
            } else {
                let message = map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("script reported failure")
                    .to_string();
                if message.contains("not found") {
                    Err(ExecError::Resolution(message))
                } else {
                    Err(ExecError::Host(message))
                }
            }
        }
        other => Ok(Some(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_outcome_success_with_data() {
        let out = script_outcome(json!({ "ok": true, "data": "hello" })).unwrap();
        assert_eq!(out, Some(json!("hello")));
    }

    #[test]
    fn test_script_outcome_success_without_data() {
        assert_eq!(script_outcome(json!({ "ok": true })).unwrap(), None);
        assert_eq!(
            script_outcome(json!({ "ok": true, "data": null })).unwrap(),
            None
        );
    }

    #[test]
    fn test_script_outcome_failure_classification() {
        let err = script_outcome(json!({ "ok": false, "error": "element not found" })).unwrap_err();
        assert!(matches!(err, ExecError::Resolution(_)));

        let err = script_outcome(json!({ "ok": false, "error": "boom" })).unwrap_err();
        assert!(matches!(err, ExecError::Host(_)));
    }

    #[test]
    fn test_script_outcome_passthrough() {
        assert_eq!(script_outcome(json!(42)).unwrap(), Some(json!(42)));
    }

    #[test]
    fn test_minimal_config_is_delay_free() {
        let config = ExecutorConfig::minimal();
        assert_eq!(config.retry_delay_ms, 0);
        assert_eq!(config.click_settle_ms, 0);
        assert_eq!(config.typing_delay_max_ms, 0);
    }
}
