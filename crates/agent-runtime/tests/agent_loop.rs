//! End-to-end loop behavior against the in-memory page host and a
//! scripted planning oracle.

use std::sync::Arc;
use std::time::Duration;

use action_executor::{Action, ActionKind, ExecutorConfig};
use agent_runtime::{AgentConfig, AgentError, AgentRuntime, AgentStatus, MockOracle};
use page_host::{MockPageHost, PageHost};
use pagepilot_core_types::{AgentId, TabId};
use serde_json::json;

fn click(selector: &str) -> Action {
    Action::new(ActionKind::Click {
        selector: selector.to_string(),
        selectors: None,
    })
    .with_reasoning("press the button")
}

async fn wait_terminal(runtime: &AgentRuntime, id: &AgentId) -> AgentStatus {
    for _ in 0..500 {
        let status = runtime.status(id).await.unwrap();
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("agent never reached a terminal status");
}

#[tokio::test]
async fn test_goal_achieved_after_one_click() {
    let host = Arc::new(MockPageHost::new());
    host.set_page("https://shop.example/cart", "Cart", "1 item in cart");
    let oracle = Arc::new(MockOracle::new());
    oracle.push_action(&click("#submit"));
    // Fallback response reports the goal achieved.

    let runtime = Arc::new(AgentRuntime::new(
        host.clone(),
        oracle.clone(),
        AgentConfig::minimal(),
    ));
    let id = runtime.create("submit the order", TabId::new());
    runtime.start(&id).await.unwrap();

    assert_eq!(wait_terminal(&runtime, &id).await, AgentStatus::Completed);

    let state = runtime.snapshot(&id).await.unwrap();
    assert_eq!(state.action_history.len(), 1);
    assert!(state.action_history[0].success);
    assert!(matches!(
        state.action_history[0].action.kind,
        ActionKind::Click { .. }
    ));
    assert!(state.completed_at.is_some());
    assert!(state.error.is_none());
    assert_eq!(oracle.call_count(), 2);

    // Terminal statuses are absorbing.
    let err = runtime.pause(&id).await.unwrap_err();
    assert!(matches!(err, AgentError::InvalidStateTransition { .. }));
    assert_eq!(runtime.status(&id).await.unwrap(), AgentStatus::Completed);
}

#[tokio::test]
async fn test_failing_click_is_retried_then_recorded_once() {
    let host = Arc::new(MockPageHost::new());
    host.fail_scripts_containing("el.click()", "element not found: #submit");
    let oracle = Arc::new(MockOracle::new());
    oracle.push_action(&click("#submit"));

    let runtime = Arc::new(AgentRuntime::with_executor_config(
        host.clone(),
        oracle.clone(),
        AgentConfig::minimal(),
        ExecutorConfig::minimal().retries(2),
    ));
    let id = runtime.create("submit the order", TabId::new());
    runtime.start(&id).await.unwrap();
    wait_terminal(&runtime, &id).await;

    let state = runtime.snapshot(&id).await.unwrap();
    // One history entry for the action, three underlying click attempts.
    let failed: Vec<_> = state
        .action_history
        .iter()
        .filter(|result| !result.success)
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].error.as_deref().unwrap().contains("not found"));
    assert_eq!(host.scripts_containing("el.click()"), 3);
}

#[tokio::test]
async fn test_iteration_budget_fails_the_agent() {
    let host = Arc::new(MockPageHost::new());
    // Oracle keeps planning scrolls forever; only one is allowed to run.
    let oracle = Arc::new(MockOracle::with_fallback(
        json!({
            "reasoning": "scroll further",
            "goal_achieved": false,
            "confidence": 0.4,
            "action": { "kind": "scroll", "direction": "down" }
        })
        .to_string(),
    ));

    let config = AgentConfig::minimal().max_iterations(1).repeat_window(0);
    let runtime = Arc::new(AgentRuntime::new(host, oracle.clone(), config));
    let id = runtime.create("read the whole page", TabId::new());
    runtime.start(&id).await.unwrap();

    assert_eq!(wait_terminal(&runtime, &id).await, AgentStatus::Failed);

    let state = runtime.snapshot(&id).await.unwrap();
    assert_eq!(state.action_history.len(), 1);
    assert!(state.error.as_deref().unwrap().contains("iterations"));
    assert_eq!(oracle.call_count(), 1);
}

#[tokio::test]
async fn test_gives_up_after_window_of_failures_without_consulting_oracle() {
    let host = Arc::new(MockPageHost::new());
    host.fail_scripts_containing("el.click()", "element not found");
    let oracle = Arc::new(MockOracle::new());
    // Five distinct selectors so the loop detector stays quiet.
    for n in 0..5 {
        oracle.push_action(&click(&format!("#candidate-{}", n)));
    }

    let runtime = Arc::new(AgentRuntime::with_executor_config(
        host,
        oracle.clone(),
        AgentConfig::minimal().repeat_window(0),
        ExecutorConfig::minimal().retries(0),
    ));
    let id = runtime.create("click something", TabId::new());
    runtime.start(&id).await.unwrap();

    assert_eq!(wait_terminal(&runtime, &id).await, AgentStatus::Failed);

    let state = runtime.snapshot(&id).await.unwrap();
    assert_eq!(state.action_history.len(), 5);
    assert!(state.error.as_deref().unwrap().contains("all failed"));
    // The give-up check runs before planning, so the oracle is never
    // asked for a sixth action.
    assert_eq!(oracle.call_count(), 5);
}

#[tokio::test]
async fn test_detects_planning_loop_of_identical_actions() {
    let host = Arc::new(MockPageHost::new());
    // Same click every time, and it succeeds. Progress is still absent.
    let oracle = Arc::new(MockOracle::with_fallback(
        json!({
            "reasoning": "try the button again",
            "goal_achieved": false,
            "confidence": 0.5,
            "action": { "kind": "click", "selector": "#refresh" }
        })
        .to_string(),
    ));

    let runtime = Arc::new(AgentRuntime::new(
        host,
        oracle.clone(),
        AgentConfig::minimal(),
    ));
    let id = runtime.create("refresh until done", TabId::new());
    runtime.start(&id).await.unwrap();

    assert_eq!(wait_terminal(&runtime, &id).await, AgentStatus::Failed);

    let state = runtime.snapshot(&id).await.unwrap();
    assert_eq!(state.action_history.len(), 3);
    assert!(state.action_history.iter().all(|result| result.success));
    assert!(state.error.as_deref().unwrap().contains("identical"));
    assert_eq!(oracle.call_count(), 3);
}

#[tokio::test]
async fn test_planning_contract_violation_is_recorded_and_loop_continues() {
    let host = Arc::new(MockPageHost::new());
    let oracle = Arc::new(MockOracle::new());
    // Not achieved, but no action either.
    oracle.push_raw(
        json!({
            "reasoning": "unsure what to do",
            "goal_achieved": false,
            "confidence": 0.1
        })
        .to_string(),
    );
    // Fallback then reports achieved, so the loop demonstrably survived.

    let runtime = Arc::new(AgentRuntime::new(
        host,
        oracle.clone(),
        AgentConfig::minimal(),
    ));
    let id = runtime.create("do the thing", TabId::new());
    runtime.start(&id).await.unwrap();

    assert_eq!(wait_terminal(&runtime, &id).await, AgentStatus::Completed);

    let state = runtime.snapshot(&id).await.unwrap();
    assert_eq!(state.action_history.len(), 1);
    assert!(!state.action_history[0].success);
    let error = state.action_history[0].error.as_deref().unwrap();
    assert!(error.contains("planning failure"));
    assert_eq!(oracle.call_count(), 2);
}

#[tokio::test]
async fn test_complete_action_finishes_the_agent_with_payload() {
    let host = Arc::new(MockPageHost::new());
    let oracle = Arc::new(MockOracle::new());
    oracle.push_action(&Action::new(ActionKind::Complete {
        reason: "price extracted".to_string(),
        data: Some(json!({ "price": "19.99" })),
    }));

    let runtime = Arc::new(AgentRuntime::new(
        host,
        oracle.clone(),
        AgentConfig::minimal(),
    ));
    let id = runtime.create("find the price", TabId::new());
    runtime.start(&id).await.unwrap();

    assert_eq!(wait_terminal(&runtime, &id).await, AgentStatus::Completed);

    let state = runtime.snapshot(&id).await.unwrap();
    assert_eq!(state.action_history.len(), 1);
    // The action's reason and data become the result payload.
    let result = state.result.unwrap();
    assert_eq!(result["reason"], json!("price extracted"));
    assert_eq!(result["data"]["price"], json!("19.99"));
    // The complete action itself ended the run; no second oracle call.
    assert_eq!(oracle.call_count(), 1);
}

#[tokio::test]
async fn test_two_agents_cannot_share_a_tab() {
    let host = Arc::new(MockPageHost::new());
    let oracle = Arc::new(MockOracle::with_fallback(
        json!({
            "reasoning": "keep scrolling",
            "goal_achieved": false,
            "confidence": 0.4,
            "action": { "kind": "scroll", "direction": "down" }
        })
        .to_string(),
    ));

    // A long delay keeps the first agent visibly active.
    let config = AgentConfig::minimal().inter_action_delay(5_000).repeat_window(0);
    let runtime = Arc::new(AgentRuntime::with_executor_config(
        host,
        oracle,
        config,
        ExecutorConfig::minimal(),
    ));
    let tab = TabId::new();
    let first = runtime.create("scroll around", tab.clone());
    let second = runtime.create("scroll around too", tab.clone());

    runtime.start(&first).await.unwrap();
    let err = runtime.start(&second).await.unwrap_err();
    assert!(matches!(err, AgentError::TabBusy(ref busy) if busy == &tab));

    // Releasing the tab lets the second agent start.
    runtime.stop(&first).await.unwrap();
    runtime.start(&second).await.unwrap();
    runtime.stop(&second).await.unwrap();
}

#[tokio::test]
async fn test_context_capture_failure_does_not_crash_the_loop() {
    let host = Arc::new(MockPageHost::new());
    let oracle = Arc::new(MockOracle::new());

    // First pass: title lookup fails, so the whole observation fails.
    struct FlakyHost {
        inner: Arc<MockPageHost>,
        failures: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PageHost for FlakyHost {
        async fn navigate(&self, tab: &TabId, url: &str) -> Result<(), page_host::HostError> {
            self.inner.navigate(tab, url).await
        }
        async fn go_back(&self, tab: &TabId) -> Result<(), page_host::HostError> {
            self.inner.go_back(tab).await
        }
        async fn go_forward(&self, tab: &TabId) -> Result<(), page_host::HostError> {
            self.inner.go_forward(tab).await
        }
        async fn reload(&self, tab: &TabId) -> Result<(), page_host::HostError> {
            self.inner.reload(tab).await
        }
        async fn run_script(
            &self,
            tab: &TabId,
            code: &str,
        ) -> Result<serde_json::Value, page_host::HostError> {
            self.inner.run_script(tab, code).await
        }
        async fn screenshot(&self, tab: &TabId) -> Result<String, page_host::HostError> {
            self.inner.screenshot(tab).await
        }
        async fn page_text(&self, tab: &TabId) -> Result<String, page_host::HostError> {
            self.inner.page_text(tab).await
        }
        async fn url(&self, tab: &TabId) -> Result<String, page_host::HostError> {
            self.inner.url(tab).await
        }
        async fn title(&self, tab: &TabId) -> Result<String, page_host::HostError> {
            if self
                .failures
                .fetch_update(
                    std::sync::atomic::Ordering::SeqCst,
                    std::sync::atomic::Ordering::SeqCst,
                    |n| if n > 0 { Some(n - 1) } else { None },
                )
                .is_ok()
            {
                return Err(page_host::HostError::Other("page is mid-navigation".to_string()));
            }
            self.inner.title(tab).await
        }
        async fn create_tab(&self, url: Option<&str>) -> Result<TabId, page_host::HostError> {
            self.inner.create_tab(url).await
        }
        async fn switch_tab(&self, tab: &TabId) -> Result<bool, page_host::HostError> {
            self.inner.switch_tab(tab).await
        }
        async fn close_tab(&self, tab: &TabId) -> Result<bool, page_host::HostError> {
            self.inner.close_tab(tab).await
        }
        async fn tab_exists(&self, tab: &TabId) -> bool {
            self.inner.tab_exists(tab).await
        }
    }

    let flaky = Arc::new(FlakyHost {
        inner: host,
        failures: std::sync::atomic::AtomicUsize::new(1),
    });
    let runtime = Arc::new(AgentRuntime::new(
        flaky,
        oracle.clone(),
        AgentConfig::minimal(),
    ));
    let id = runtime.create("wait out the navigation", TabId::new());
    runtime.start(&id).await.unwrap();

    // Second pass succeeds and the fallback reports achieved.
    assert_eq!(wait_terminal(&runtime, &id).await, AgentStatus::Completed);

    let state = runtime.snapshot(&id).await.unwrap();
    assert_eq!(state.action_history.len(), 1);
    assert!(!state.action_history[0].success);
    assert!(state.action_history[0]
        .error
        .as_deref()
        .unwrap()
        .contains("context capture failed"));
    // Planning never happened during the failed pass.
    assert_eq!(oracle.call_count(), 1);
}

#[tokio::test]
async fn test_resume_waits_for_the_in_flight_pass_to_finish() {
    let host = Arc::new(MockPageHost::new());
    host.set_page("https://shop.example", "Shop", "welcome");
    let oracle = Arc::new(MockOracle::new());
    // First pass deliberately lingers so pause/resume land mid-pass.
    oracle.push_action(&Action::new(ActionKind::Wait { duration_ms: 600 }));
    // Fallback response reports the goal achieved.

    let runtime = Arc::new(AgentRuntime::new(
        host.clone(),
        oracle.clone(),
        AgentConfig::minimal(),
    ));
    let id = runtime.create("browse the shop", TabId::new());
    runtime.start(&id).await.unwrap();

    // Pause while the wait action is still executing, then resume
    // concurrently. The resume must not run a second planning pass
    // until the in-flight one has completed.
    tokio::time::sleep(Duration::from_millis(100)).await;
    runtime.pause(&id).await.unwrap();
    let resume = {
        let runtime = runtime.clone();
        let id = id.clone();
        tokio::spawn(async move { runtime.resume(&id).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(oracle.call_count(), 1, "planning ran again mid-pass");
    let state = runtime.snapshot(&id).await.unwrap();
    assert!(state.action_history.is_empty());
    assert_eq!(state.status, AgentStatus::Paused);

    resume.await.unwrap().unwrap();
    assert_eq!(wait_terminal(&runtime, &id).await, AgentStatus::Completed);

    let state = runtime.snapshot(&id).await.unwrap();
    assert_eq!(state.action_history.len(), 1);
    assert!(state.action_history[0].success);
    assert_eq!(oracle.call_count(), 2);
}
