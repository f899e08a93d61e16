//! The page host trait consumed by the execution core.

use async_trait::async_trait;
use pagepilot_core_types::TabId;
use serde_json::Value;

use crate::errors::HostError;

/// Abstraction over the browser process that owns pages and tabs.
///
/// Every page-mutating call is async and may suspend; implementations are
/// expected to map their own deadline handling onto [`HostError::Timeout`]
/// rather than hanging indefinitely.
#[async_trait]
pub trait PageHost: Send + Sync {
    /// Load `url` in the given tab. Resolves once the navigation has been
    /// issued; callers poll readiness separately via [`Self::run_script`].
    async fn navigate(&self, tab: &TabId, url: &str) -> Result<(), HostError>;

    /// Go back one entry in the tab's history.
    async fn go_back(&self, tab: &TabId) -> Result<(), HostError>;

    /// Go forward one entry in the tab's history.
    async fn go_forward(&self, tab: &TabId) -> Result<(), HostError>;

    /// Reload the current page.
    async fn reload(&self, tab: &TabId) -> Result<(), HostError>;

    /// Evaluate a script in the page sandbox and return its
    /// JSON-serializable result.
    async fn run_script(&self, tab: &TabId, code: &str) -> Result<Value, HostError>;

    /// Capture a screenshot of the tab, base64-encoded.
    async fn screenshot(&self, tab: &TabId) -> Result<String, HostError>;

    /// Full visible text of the page.
    async fn page_text(&self, tab: &TabId) -> Result<String, HostError>;

    /// Current URL of the tab.
    async fn url(&self, tab: &TabId) -> Result<String, HostError>;

    /// Current document title of the tab.
    async fn title(&self, tab: &TabId) -> Result<String, HostError>;

    /// Open a new tab, optionally navigating it to `url`.
    async fn create_tab(&self, url: Option<&str>) -> Result<TabId, HostError>;

    /// Make the given tab the active one. Returns false if the tab is gone.
    async fn switch_tab(&self, tab: &TabId) -> Result<bool, HostError>;

    /// Close the given tab. Returns false if the tab is gone.
    async fn close_tab(&self, tab: &TabId) -> Result<bool, HostError>;

    /// Whether the tab is still alive.
    async fn tab_exists(&self, tab: &TabId) -> bool;
}
