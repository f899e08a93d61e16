//! Pre-flight validation for action parameters.
//!
//! A validation failure short-circuits execution: the executor returns a
//! failed result without touching the page and without retrying.

use url::Url;

use crate::errors::ExecError;
use crate::types::{ActionKind, LocatorGroup, ScrollDirection};

/// Upper bound for `wait` durations.
pub const MAX_WAIT_MS: u64 = 30_000;
/// Upper bound for `wait_for_element` timeouts.
pub const MAX_ELEMENT_WAIT_MS: u64 = 60_000;

/// Validate one action kind without touching the page.
pub fn validate(kind: &ActionKind) -> Result<(), ExecError> {
    match kind {
        ActionKind::Navigate { url } => {
            normalize_url(url)?;
            Ok(())
        }
        ActionKind::GoBack | ActionKind::GoForward | ActionKind::Reload => Ok(()),
        ActionKind::Click {
            selector,
            selectors,
        } => require_target("click", selector, selectors.as_deref()),
        ActionKind::Type {
            selector,
            selectors,
            text,
            ..
        } => {
            require_target("type", selector, selectors.as_deref())?;
            if text.is_empty() {
                return Err(ExecError::validation("type requires non-empty text"));
            }
            Ok(())
        }
        ActionKind::Select { selector, value } => {
            require_selector("select", selector)?;
            if value.trim().is_empty() {
                return Err(ExecError::validation("select requires a value"));
            }
            Ok(())
        }
        ActionKind::Scroll { direction, amount } => {
            if matches!(direction, ScrollDirection::To) && amount.is_none() {
                return Err(ExecError::validation(
                    "scroll direction 'to' requires an absolute amount",
                ));
            }
            Ok(())
        }
        ActionKind::Hover { selector } => require_selector("hover", selector),
        ActionKind::Extract { schema } => {
            if schema.is_empty() {
                return Err(ExecError::validation("extract requires a non-empty schema"));
            }
            Ok(())
        }
        ActionKind::GetText { selector } => require_selector("get_text", selector),
        ActionKind::GetAttribute {
            selector,
            attribute,
        } => {
            require_selector("get_attribute", selector)?;
            if attribute.trim().is_empty() {
                return Err(ExecError::validation(
                    "get_attribute requires an attribute name",
                ));
            }
            Ok(())
        }
        ActionKind::Wait { duration_ms } => {
            if *duration_ms > MAX_WAIT_MS {
                return Err(ExecError::validation(format!(
                    "wait duration {}ms exceeds maximum {}ms",
                    duration_ms, MAX_WAIT_MS
                )));
            }
            Ok(())
        }
        ActionKind::WaitForElement {
            selector,
            timeout_ms,
        } => {
            require_selector("wait_for_element", selector)?;
            if let Some(timeout) = timeout_ms {
                if *timeout > MAX_ELEMENT_WAIT_MS {
                    return Err(ExecError::validation(format!(
                        "wait_for_element timeout {}ms exceeds maximum {}ms",
                        timeout, MAX_ELEMENT_WAIT_MS
                    )));
                }
            }
            Ok(())
        }
        ActionKind::CreateTab { url } => {
            if let Some(url) = url {
                normalize_url(url)?;
            }
            Ok(())
        }
        ActionKind::SwitchTab { tab_id } => {
            if tab_id.0.trim().is_empty() {
                return Err(ExecError::validation("switch_tab requires a tab id"));
            }
            Ok(())
        }
        ActionKind::CloseTab { tab_id } => {
            if tab_id.0.trim().is_empty() {
                return Err(ExecError::validation("close_tab requires a tab id"));
            }
            Ok(())
        }
        ActionKind::Complete { .. } => Ok(()),
    }
}

/// Parse a URL, auto-prepending `https://` when no scheme is present.
pub fn normalize_url(raw: &str) -> Result<String, ExecError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExecError::validation("navigate requires a URL"));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    Url::parse(&candidate)
        .map(|url| url.to_string())
        .map_err(|err| ExecError::validation(format!("unparseable URL '{}': {}", raw, err)))
}

fn require_selector(kind: &str, selector: &str) -> Result<(), ExecError> {
    if selector.trim().is_empty() {
        return Err(ExecError::validation(format!(
            "{} requires a non-empty selector",
            kind
        )));
    }
    Ok(())
}

fn require_target(
    kind: &str,
    selector: &str,
    selectors: Option<&[LocatorGroup]>,
) -> Result<(), ExecError> {
    let has_group_candidate = selectors
        .map(|groups| {
            groups
                .iter()
                .any(|group| group.0.iter().any(|candidate| !candidate.trim().is_empty()))
        })
        .unwrap_or(false);
    if !has_group_candidate && selector.trim().is_empty() {
        return Err(ExecError::validation(format!(
            "{} requires a selector or a locator group",
            kind
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocatorGroup;

    #[test]
    fn test_normalize_url_prepends_scheme() {
        assert_eq!(
            normalize_url("example.com").unwrap(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url("http://example.com/a").unwrap(),
            "http://example.com/a"
        );
    }

    #[test]
    fn test_normalize_url_rejects_garbage() {
        assert!(normalize_url("").is_err());
        assert!(normalize_url("ht tp://??").is_err());
    }

    #[test]
    fn test_click_requires_some_target() {
        assert!(validate(&ActionKind::Click {
            selector: String::new(),
            selectors: None,
        })
        .is_err());

        assert!(validate(&ActionKind::Click {
            selector: String::new(),
            selectors: Some(vec![LocatorGroup(vec!["#a".to_string()])]),
        })
        .is_ok());

        // Groups with only blank candidates do not count as a target.
        assert!(validate(&ActionKind::Click {
            selector: String::new(),
            selectors: Some(vec![LocatorGroup(vec!["  ".to_string()])]),
        })
        .is_err());
    }

    #[test]
    fn test_type_requires_text() {
        assert!(validate(&ActionKind::Type {
            selector: "#input".to_string(),
            selectors: None,
            text: String::new(),
            clear: false,
        })
        .is_err());
    }

    #[test]
    fn test_wait_bounds() {
        assert!(validate(&ActionKind::Wait { duration_ms: 30_000 }).is_ok());
        assert!(validate(&ActionKind::Wait { duration_ms: 30_001 }).is_err());
        assert!(validate(&ActionKind::WaitForElement {
            selector: "#x".to_string(),
            timeout_ms: Some(60_001),
        })
        .is_err());
    }

    #[test]
    fn test_scroll_to_requires_amount() {
        assert!(validate(&ActionKind::Scroll {
            direction: ScrollDirection::To,
            amount: None,
        })
        .is_err());
        assert!(validate(&ActionKind::Scroll {
            direction: ScrollDirection::Down,
            amount: None,
        })
        .is_ok());
    }
}
