//! Action model and execution results.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pagepilot_core_types::TabId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One typed, immutable instruction produced by the planner or stored in
/// a skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// The operation to perform.
    #[serde(flatten)]
    pub kind: ActionKind,

    /// Planner-supplied free-text rationale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// When the action was produced.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            reasoning: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Whether `other` performs the same operation with the same
    /// parameters. Reasoning and timestamps are ignored; used by the
    /// loop-detection heuristic.
    pub fn same_operation(&self, other: &Action) -> bool {
        serde_json::to_value(&self.kind).ok() == serde_json::to_value(&other.kind).ok()
    }
}

/// Ordered list of fallback selector candidates for one target element.
///
/// Resolution tries groups in order and candidates within a group in
/// order, stopping at the first candidate whose operation succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorGroup(pub Vec<String>);

/// Scroll mode for scroll actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    /// Absolute scroll to a vertical offset (carried in `amount`).
    To,
}

/// How one extract-schema field reads its value from the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractValueType {
    Text,
    Href,
    Src,
    Value,
    Html,
}

impl Default for ExtractValueType {
    fn default() -> Self {
        Self::Text
    }
}

/// One field of an extract-action schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractField {
    pub selector: String,
    #[serde(default)]
    pub value_type: ExtractValueType,
    /// Collect all matches as an array instead of the first match.
    #[serde(default)]
    pub multiple: bool,
}

/// Closed set of supported operations.
///
/// New kinds require touching every match site; that is intentional so a
/// kind can never be silently unhandled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    Navigate {
        url: String,
    },
    GoBack,
    GoForward,
    Reload,
    Click {
        selector: String,
        /// Optional ordered locator fallback groups; when present they
        /// take precedence over `selector`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selectors: Option<Vec<LocatorGroup>>,
    },
    Type {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selectors: Option<Vec<LocatorGroup>>,
        text: String,
        /// Clear the existing value before typing.
        #[serde(default)]
        clear: bool,
    },
    Select {
        selector: String,
        value: String,
    },
    Scroll {
        direction: ScrollDirection,
        /// Relative pixels for up/down (default 300), absolute vertical
        /// offset for `to`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<i64>,
    },
    Hover {
        selector: String,
    },
    Extract {
        schema: HashMap<String, ExtractField>,
    },
    GetText {
        selector: String,
    },
    GetAttribute {
        selector: String,
        attribute: String,
    },
    Wait {
        duration_ms: u64,
    },
    WaitForElement {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    CreateTab {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    SwitchTab {
        tab_id: TabId,
    },
    CloseTab {
        tab_id: TabId,
    },
    /// Terminal no-op whose payload becomes the agent's result.
    Complete {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl ActionKind {
    /// Stable lowercase name matching the serialized `kind` tag.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Navigate { .. } => "navigate",
            ActionKind::GoBack => "go_back",
            ActionKind::GoForward => "go_forward",
            ActionKind::Reload => "reload",
            ActionKind::Click { .. } => "click",
            ActionKind::Type { .. } => "type",
            ActionKind::Select { .. } => "select",
            ActionKind::Scroll { .. } => "scroll",
            ActionKind::Hover { .. } => "hover",
            ActionKind::Extract { .. } => "extract",
            ActionKind::GetText { .. } => "get_text",
            ActionKind::GetAttribute { .. } => "get_attribute",
            ActionKind::Wait { .. } => "wait",
            ActionKind::WaitForElement { .. } => "wait_for_element",
            ActionKind::CreateTab { .. } => "create_tab",
            ActionKind::SwitchTab { .. } => "switch_tab",
            ActionKind::CloseTab { .. } => "close_tab",
            ActionKind::Complete { .. } => "complete",
        }
    }

    /// Whether the kind mutates page or tab state (screenshot-worthy).
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ActionKind::Navigate { .. }
                | ActionKind::GoBack
                | ActionKind::GoForward
                | ActionKind::Reload
                | ActionKind::Click { .. }
                | ActionKind::Type { .. }
                | ActionKind::Select { .. }
                | ActionKind::Scroll { .. }
                | ActionKind::Hover { .. }
                | ActionKind::CreateTab { .. }
                | ActionKind::SwitchTab { .. }
                | ActionKind::CloseTab { .. }
        )
    }
}

/// Immutable outcome record of attempting one action.
///
/// Produced exactly once per attempted action, after all internal retries
/// are exhausted or one attempt succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn succeeded(
        action: Action,
        data: Option<Value>,
        screenshot: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            success: true,
            action,
            error: None,
            data,
            screenshot,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(action: Action, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            action,
            error: Some(error.into()),
            data: None,
            screenshot: None,
            duration_ms,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_serialization() {
        let action = Action::new(ActionKind::Click {
            selector: "#submit".to_string(),
            selectors: None,
        });
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"kind\":\"click\""));
        assert!(json.contains("\"selector\":\"#submit\""));

        let parsed: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind.name(), "click");
    }

    #[test]
    fn test_same_operation_ignores_reasoning() {
        let a = Action::new(ActionKind::Click {
            selector: "#a".to_string(),
            selectors: None,
        })
        .with_reasoning("first try");
        let b = Action::new(ActionKind::Click {
            selector: "#a".to_string(),
            selectors: None,
        })
        .with_reasoning("second try");
        let c = Action::new(ActionKind::Click {
            selector: "#b".to_string(),
            selectors: None,
        });

        assert!(a.same_operation(&b));
        assert!(!a.same_operation(&c));
    }

    #[test]
    fn test_mutating_classification() {
        assert!(ActionKind::Reload.is_mutating());
        assert!(!ActionKind::Wait { duration_ms: 10 }.is_mutating());
        assert!(!ActionKind::Complete {
            reason: "done".to_string(),
            data: None
        }
        .is_mutating());
    }

    #[test]
    fn test_locator_group_round_trip() {
        let kind = ActionKind::Click {
            selector: "#fallback".to_string(),
            selectors: Some(vec![
                LocatorGroup(vec!["#primary".to_string(), "aria/Submit".to_string()]),
                LocatorGroup(vec!["text/Submit".to_string()]),
            ]),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["selectors"][0][1], "aria/Submit");

        let parsed: ActionKind = serde_json::from_value(json).unwrap();
        match parsed {
            ActionKind::Click { selectors, .. } => {
                assert_eq!(selectors.unwrap().len(), 2);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }
}
