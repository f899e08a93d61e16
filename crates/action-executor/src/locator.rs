//! Locator normalization and in-page resolver scripts.
//!
//! Selector strings may carry a strategy prefix (`xpath/`, `aria/`,
//! `text/`, `pierce/`); everything else is treated as CSS. The in-page
//! resolver applies a fallback chain for CSS selectors: exact match,
//! `#id`, XPath text match, common attribute match, then button/link
//! text match.

use serde_json::Value;

use crate::types::{ExtractField, ExtractValueType, LocatorGroup, ScrollDirection};

/// A selector string with its strategy prefix resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedSelector {
    Css(String),
    XPath(String),
    Text(String),
}

/// Resolve the strategy prefix of one candidate selector.
pub fn normalize(raw: &str) -> NormalizedSelector {
    if let Some(rest) = raw.strip_prefix("xpath/") {
        NormalizedSelector::XPath(rest.to_string())
    } else if let Some(rest) = raw.strip_prefix("aria/") {
        NormalizedSelector::Css(format!("[aria-label={}]", js_str(rest)))
    } else if let Some(rest) = raw.strip_prefix("text/") {
        NormalizedSelector::Text(rest.to_string())
    } else if let Some(rest) = raw.strip_prefix("pierce/") {
        // Shadow piercing is the host's concern; strip the prefix and
        // treat the remainder as CSS.
        NormalizedSelector::Css(rest.to_string())
    } else {
        NormalizedSelector::Css(raw.to_string())
    }
}

/// Build the ordered candidate groups for an element-targeting action.
///
/// When locator groups are present they take precedence over the single
/// `selector` field; blank candidates are dropped.
pub fn candidate_groups(selector: &str, selectors: Option<&[LocatorGroup]>) -> Vec<Vec<String>> {
    if let Some(groups) = selectors {
        let filtered: Vec<Vec<String>> = groups
            .iter()
            .map(|group| {
                group
                    .0
                    .iter()
                    .filter(|candidate| !candidate.trim().is_empty())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|group: &Vec<String>| !group.is_empty())
            .collect();
        if !filtered.is_empty() {
            return filtered;
        }
    }
    vec![vec![selector.to_string()]]
}

/// JSON-escape a string for embedding into a script literal.
fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// In-page helper functions shared by all element scripts.
const FINDER_JS: &str = r#"
function __ppFind(selector) {
  try { const el = document.querySelector(selector); if (el) return el; } catch (e) {}
  try {
    const el = document.getElementById(selector.replace(/^#/, ''));
    if (el) return el;
  } catch (e) {}
  try {
    const xp = document.evaluate(
      "//*[contains(text(), " + JSON.stringify(selector) + ")]",
      document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null);
    if (xp.singleNodeValue) return xp.singleNodeValue;
  } catch (e) {}
  try {
    const quoted = JSON.stringify(selector);
    const el = document.querySelector(
      "[name=" + quoted + "], [aria-label=" + quoted + "], [data-testid=" + quoted + "]");
    if (el) return el;
  } catch (e) {}
  const lowered = selector.trim().toLowerCase();
  for (const el of document.querySelectorAll('button, a, [role="button"]')) {
    if ((el.textContent || '').trim().toLowerCase() === lowered) return el;
  }
  return null;
}
function __ppXPath(expression) {
  try {
    const xp = document.evaluate(
      expression, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null);
    return xp.singleNodeValue;
  } catch (e) { return null; }
}
function __ppByText(needle) {
  const lowered = needle.trim().toLowerCase();
  for (const el of document.querySelectorAll('*')) {
    if (el.children.length === 0 &&
        (el.textContent || '').trim().toLowerCase().includes(lowered)) return el;
  }
  return null;
}
"#;

fn wrap(body: &str) -> String {
    format!("{}\n(() => {{\n{}\n}})();", FINDER_JS, body.trim())
}

fn resolve_expr(selector: &NormalizedSelector) -> String {
    match selector {
        NormalizedSelector::Css(s) => format!("__ppFind({})", js_str(s)),
        NormalizedSelector::XPath(s) => format!("__ppXPath({})", js_str(s)),
        NormalizedSelector::Text(s) => format!("__ppByText({})", js_str(s)),
    }
}

const NOT_FOUND: &str = "return { ok: false, error: 'element not found' };";

/// Find the element and scroll it into view.
pub(crate) fn locate_script(selector: &NormalizedSelector) -> String {
    let body = format!(
        "const el = {};\nif (!el) {}\nel.scrollIntoView({{ block: 'center' }});\nreturn {{ ok: true }};",
        resolve_expr(selector),
        NOT_FOUND
    );
    wrap(&body)
}

/// Dispatch a click on the element.
pub(crate) fn click_script(selector: &NormalizedSelector) -> String {
    let body = format!(
        "const el = {};\nif (!el) {}\nel.click();\nreturn {{ ok: true }};",
        resolve_expr(selector),
        NOT_FOUND
    );
    wrap(&body)
}

/// Focus the element, optionally clearing its current value.
pub(crate) fn focus_script(selector: &NormalizedSelector, clear: bool) -> String {
    let clear_js = if clear {
        "el.value = '';\nel.dispatchEvent(new Event('input', { bubbles: true }));\n"
    } else {
        ""
    };
    let body = format!(
        "const el = {};\nif (!el) {}\nel.focus();\n{}return {{ ok: true }};",
        resolve_expr(selector),
        NOT_FOUND,
        clear_js
    );
    wrap(&body)
}

/// Append one character and fire an input event.
pub(crate) fn type_char_script(selector: &NormalizedSelector, ch: char) -> String {
    let body = format!(
        "const el = {};\nif (!el) {}\nel.value = (el.value || '') + {};\nel.dispatchEvent(new Event('input', {{ bubbles: true }}));\nreturn {{ ok: true }};",
        resolve_expr(selector),
        NOT_FOUND,
        js_str(&ch.to_string())
    );
    wrap(&body)
}

/// Fire the end-of-typing change/blur notifications.
pub(crate) fn finish_typing_script(selector: &NormalizedSelector) -> String {
    let body = format!(
        "const el = {};\nif (!el) {}\nel.dispatchEvent(new Event('change', {{ bubbles: true }}));\nel.dispatchEvent(new Event('blur', {{ bubbles: true }}));\nreturn {{ ok: true }};",
        resolve_expr(selector),
        NOT_FOUND
    );
    wrap(&body)
}

/// Select an option by value, falling back to visible text.
pub(crate) fn select_script(selector: &NormalizedSelector, value: &str) -> String {
    let body = format!(
        "const el = {};\nif (!el) {}\nconst wanted = {};\nlet matched = false;\nfor (const option of el.options || []) {{\n  if (option.value === wanted || option.textContent.trim() === wanted) {{\n    el.value = option.value;\n    matched = true;\n    break;\n  }}\n}}\nif (!matched) return {{ ok: false, error: 'option not found: ' + wanted }};\nel.dispatchEvent(new Event('change', {{ bubbles: true }}));\nreturn {{ ok: true }};",
        resolve_expr(selector),
        NOT_FOUND,
        js_str(value)
    );
    wrap(&body)
}

/// Dispatch hover-equivalent mouse events on the element.
pub(crate) fn hover_script(selector: &NormalizedSelector) -> String {
    let body = format!(
        "const el = {};\nif (!el) {}\nel.scrollIntoView({{ block: 'center' }});\nel.dispatchEvent(new MouseEvent('mouseover', {{ bubbles: true }}));\nel.dispatchEvent(new MouseEvent('mouseenter', {{ bubbles: true }}));\nreturn {{ ok: true }};",
        resolve_expr(selector),
        NOT_FOUND
    );
    wrap(&body)
}

/// Read the trimmed text content of the element.
pub(crate) fn get_text_script(selector: &NormalizedSelector) -> String {
    let body = format!(
        "const el = {};\nif (!el) {}\nreturn {{ ok: true, data: (el.textContent || '').trim() }};",
        resolve_expr(selector),
        NOT_FOUND
    );
    wrap(&body)
}

/// Read one attribute of the element.
pub(crate) fn get_attribute_script(selector: &NormalizedSelector, attribute: &str) -> String {
    let body = format!(
        "const el = {};\nif (!el) {}\nreturn {{ ok: true, data: el.getAttribute({}) }};",
        resolve_expr(selector),
        NOT_FOUND,
        js_str(attribute)
    );
    wrap(&body)
}

/// Check whether the element currently exists.
pub(crate) fn exists_script(selector: &NormalizedSelector) -> String {
    let body = format!(
        "const el = {};\nreturn {{ ok: el !== null }};",
        resolve_expr(selector)
    );
    wrap(&body)
}

/// Extract one schema field; invalid selectors degrade to empty data.
pub(crate) fn extract_field_script(field: &ExtractField) -> String {
    let read_expr = match field.value_type {
        ExtractValueType::Text => "(el.textContent || '').trim()",
        ExtractValueType::Href => "el.getAttribute('href')",
        ExtractValueType::Src => "el.getAttribute('src')",
        ExtractValueType::Value => "el.value !== undefined ? el.value : el.getAttribute('value')",
        ExtractValueType::Html => "el.innerHTML",
    };
    let tail = if field.multiple {
        "return { ok: true, data: nodes.map(read) };"
    } else {
        "return { ok: true, data: nodes.length ? read(nodes[0]) : null };"
    };
    let body = format!(
        "let nodes = [];\ntry {{ nodes = Array.from(document.querySelectorAll({})); }} catch (e) {{ nodes = []; }}\nconst read = (el) => {};\n{}",
        js_str(&field.selector),
        read_expr,
        tail
    );
    wrap(&body)
}

/// Relative or absolute window scroll.
pub(crate) fn scroll_script(direction: ScrollDirection, amount: Option<i64>, default_px: i64) -> String {
    let body = match direction {
        ScrollDirection::Up => format!(
            "window.scrollBy(0, -{});\nreturn {{ ok: true }};",
            amount.unwrap_or(default_px)
        ),
        ScrollDirection::Down => format!(
            "window.scrollBy(0, {});\nreturn {{ ok: true }};",
            amount.unwrap_or(default_px)
        ),
        ScrollDirection::To => format!(
            "window.scrollTo(0, {});\nreturn {{ ok: true }};",
            amount.unwrap_or(0)
        ),
    };
    wrap(&body)
}

/// Report whether the document has finished loading.
pub(crate) fn ready_state_script() -> String {
    wrap("return { ok: document.readyState === 'complete' };")
}
