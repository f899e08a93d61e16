//! In-memory page host used by tests and the CLI dry-run path.
//!
//! Records every incoming call so suites can assert on call counts, and
//! supports scripted script results plus per-pattern failure injection.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use pagepilot_core_types::TabId;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::HostError;
use crate::host::PageHost;

/// One recorded host invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum HostCall {
    Navigate(String),
    GoBack,
    GoForward,
    Reload,
    RunScript(String),
    Screenshot,
    PageText,
    Url,
    Title,
    CreateTab(Option<String>),
    SwitchTab(TabId),
    CloseTab(TabId),
}

/// Substring-matched rule applied to incoming scripts.
struct ScriptRule {
    needle: String,
    outcome: Result<Value, HostError>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<HostCall>,
    closed_tabs: HashSet<TabId>,
    url: String,
    title: String,
    page_text: String,
    script_queue: VecDeque<Result<Value, HostError>>,
    script_rules: Vec<ScriptRule>,
    navigation_failure: Option<String>,
    screenshot_failure: Option<String>,
}

/// Deterministic host for offline execution.
///
/// Scripts succeed with `{"ok": true}` unless a queued result or a
/// matching rule says otherwise. Queued results are consumed before rules
/// are consulted.
pub struct MockPageHost {
    state: Mutex<MockState>,
}

impl MockPageHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                url: "about:blank".to_string(),
                title: "blank".to_string(),
                ..MockState::default()
            }),
        }
    }

    /// Queue one script result; consumed in FIFO order.
    pub fn push_script_result(&self, result: Result<Value, HostError>) {
        self.state.lock().script_queue.push_back(result);
    }

    /// Every script whose source contains `needle` fails with `message`.
    pub fn fail_scripts_containing(&self, needle: impl Into<String>, message: impl Into<String>) {
        self.state.lock().script_rules.push(ScriptRule {
            needle: needle.into(),
            outcome: Err(HostError::Script(message.into())),
        });
    }

    /// Every script whose source contains `needle` resolves to `value`.
    pub fn answer_scripts_containing(&self, needle: impl Into<String>, value: Value) {
        self.state.lock().script_rules.push(ScriptRule {
            needle: needle.into(),
            outcome: Ok(value),
        });
    }

    /// All subsequent navigations fail with `message`.
    pub fn fail_navigation(&self, message: impl Into<String>) {
        self.state.lock().navigation_failure = Some(message.into());
    }

    /// All subsequent screenshots fail with `message`.
    pub fn fail_screenshots(&self, message: impl Into<String>) {
        self.state.lock().screenshot_failure = Some(message.into());
    }

    /// Seed the page observation returned by `url`/`title`/`page_text`.
    pub fn set_page(&self, url: impl Into<String>, title: impl Into<String>, text: impl Into<String>) {
        let mut state = self.state.lock();
        state.url = url.into();
        state.title = title.into();
        state.page_text = text.into();
    }

    /// Snapshot of every call received so far.
    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    /// Total number of calls received.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Number of script evaluations whose source contains `needle`.
    pub fn scripts_containing(&self, needle: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, HostCall::RunScript(code) if code.contains(needle)))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, call: HostCall) {
        self.state.lock().calls.push(call);
    }
}

impl Default for MockPageHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageHost for MockPageHost {
    async fn navigate(&self, _tab: &TabId, url: &str) -> Result<(), HostError> {
        self.record(HostCall::Navigate(url.to_string()));
        let mut state = self.state.lock();
        if let Some(message) = &state.navigation_failure {
            return Err(HostError::Navigation(message.clone()));
        }
        state.url = url.to_string();
        Ok(())
    }

    async fn go_back(&self, _tab: &TabId) -> Result<(), HostError> {
        self.record(HostCall::GoBack);
        Ok(())
    }

    async fn go_forward(&self, _tab: &TabId) -> Result<(), HostError> {
        self.record(HostCall::GoForward);
        Ok(())
    }

    async fn reload(&self, _tab: &TabId) -> Result<(), HostError> {
        self.record(HostCall::Reload);
        Ok(())
    }

    async fn run_script(&self, _tab: &TabId, code: &str) -> Result<Value, HostError> {
        self.record(HostCall::RunScript(code.to_string()));
        let mut state = self.state.lock();
        if let Some(queued) = state.script_queue.pop_front() {
            return queued;
        }
        for rule in &state.script_rules {
            if code.contains(&rule.needle) {
                debug!(needle = %rule.needle, "mock script rule matched");
                return rule.outcome.clone();
            }
        }
        Ok(json!({ "ok": true }))
    }

    async fn screenshot(&self, _tab: &TabId) -> Result<String, HostError> {
        self.record(HostCall::Screenshot);
        let state = self.state.lock();
        match &state.screenshot_failure {
            Some(message) => Err(HostError::Screenshot(message.clone())),
            None => Ok("bW9jay1zY3JlZW5zaG90".to_string()),
        }
    }

    async fn page_text(&self, _tab: &TabId) -> Result<String, HostError> {
        self.record(HostCall::PageText);
        Ok(self.state.lock().page_text.clone())
    }

    async fn url(&self, _tab: &TabId) -> Result<String, HostError> {
        self.record(HostCall::Url);
        Ok(self.state.lock().url.clone())
    }

    async fn title(&self, _tab: &TabId) -> Result<String, HostError> {
        self.record(HostCall::Title);
        Ok(self.state.lock().title.clone())
    }

    async fn create_tab(&self, url: Option<&str>) -> Result<TabId, HostError> {
        self.record(HostCall::CreateTab(url.map(str::to_string)));
        Ok(TabId::new())
    }

    async fn switch_tab(&self, tab: &TabId) -> Result<bool, HostError> {
        self.record(HostCall::SwitchTab(tab.clone()));
        Ok(!self.state.lock().closed_tabs.contains(tab))
    }

    async fn close_tab(&self, tab: &TabId) -> Result<bool, HostError> {
        self.record(HostCall::CloseTab(tab.clone()));
        Ok(self.state.lock().closed_tabs.insert(tab.clone()))
    }

    async fn tab_exists(&self, tab: &TabId) -> bool {
        !self.state.lock().closed_tabs.contains(tab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let host = MockPageHost::new();
        let tab = TabId::new();

        host.navigate(&tab, "https://example.com").await.unwrap();
        host.run_script(&tab, "1 + 1").await.unwrap();

        let calls = host.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], HostCall::Navigate("https://example.com".to_string()));
        assert!(matches!(&calls[1], HostCall::RunScript(code) if code == "1 + 1"));
    }

    #[tokio::test]
    async fn test_queued_results_take_precedence() {
        let host = MockPageHost::new();
        let tab = TabId::new();

        host.push_script_result(Ok(json!({ "ok": false, "error": "nope" })));
        host.fail_scripts_containing("nope", "rule should not fire");

        let value = host.run_script(&tab, "contains nope").await.unwrap();
        assert_eq!(value["ok"], json!(false));
    }

    #[tokio::test]
    async fn test_script_failure_rule() {
        let host = MockPageHost::new();
        let tab = TabId::new();
        host.fail_scripts_containing("click", "element not found");

        let err = host.run_script(&tab, "el.click()").await.unwrap_err();
        assert!(err.to_string().contains("element not found"));
        assert_eq!(host.scripts_containing("click"), 1);
    }

    #[tokio::test]
    async fn test_close_tab_marks_tab_gone() {
        let host = MockPageHost::new();
        let tab = host.create_tab(None).await.unwrap();
        assert!(host.tab_exists(&tab).await);
        assert!(host.close_tab(&tab).await.unwrap());
        assert!(!host.tab_exists(&tab).await);
        assert!(!host.close_tab(&tab).await.unwrap());
    }
}
