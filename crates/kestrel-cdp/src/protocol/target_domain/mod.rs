//! Target domain types.
//!
//! The Target domain discovers, attaches to, and manages browser targets
//! (pages, iframes, workers) and browser contexts.

use serde::{Deserialize, Serialize};

/// Information about a target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// Target identifier.
    pub target_id: String,
    /// Target type (`page`, `iframe`, `worker`, `service_worker`,
    /// `background_page`, ...).
    #[serde(rename = "type")]
    pub target_type: String,
    /// Target title.
    pub title: String,
    /// Target URL.
    pub url: String,
    /// Whether a session is attached.
    pub attached: bool,
    /// Owning browser context, absent for the default context.
    pub browser_context_id: Option<String>,
    /// Target that opened this one, for popups.
    pub opener_id: Option<String>,
}

/// Parameters for `Target.createBrowserContext`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrowserContextParams {
    /// Dispose the context when the last session detaches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispose_on_detach: Option<bool>,
    /// Proxy server override for the context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_server: Option<String>,
    /// Proxy bypass list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_bypass_list: Option<String>,
}

/// Result of `Target.createBrowserContext`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrowserContextResult {
    /// Id of the created context.
    pub browser_context_id: String,
}

/// Parameters for `Target.disposeBrowserContext`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposeBrowserContextParams {
    /// Context to dispose.
    pub browser_context_id: String,
}

/// Parameters for `Target.createTarget`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetParams {
    /// Initial URL of the new page.
    pub url: String,
    /// Frame width in device-independent pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Frame height in device-independent pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Context to create the page in; absent means the default context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
    /// Open as a background tab.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
    /// Open in a new window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_window: Option<bool>,
}

impl CreateTargetParams {
    /// Create params for a page at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
            browser_context_id: None,
            background: None,
            new_window: None,
        }
    }

    /// Place the page in a specific browser context.
    #[must_use]
    pub fn browser_context_id(mut self, id: impl Into<String>) -> Self {
        self.browser_context_id = Some(id.into());
        self
    }
}

/// Result of `Target.createTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetResult {
    /// Id of the created target.
    pub target_id: String,
}

/// Parameters for `Target.attachToTarget`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetParams {
    /// Target to attach to.
    pub target_id: String,
    /// Flat-session access via `sessionId`; always set by this client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

/// Result of `Target.attachToTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetResult {
    /// Session id for the attached target.
    pub session_id: String,
}

/// Parameters for `Target.detachFromTarget`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachFromTargetParams {
    /// Session to detach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Parameters for `Target.closeTarget`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTargetParams {
    /// Target to close.
    pub target_id: String,
}

/// Result of `Target.closeTarget`.
#[derive(Debug, Clone, Deserialize)]
pub struct CloseTargetResult {
    /// Whether the close was accepted.
    pub success: bool,
}

/// Parameters for `Target.activateTarget`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateTargetParams {
    /// Target to bring to the foreground.
    pub target_id: String,
}

/// Parameters for `Target.getTargetInfo`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetInfoParams {
    /// Target to describe; defaults to the session's own target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

/// Result of `Target.getTargetInfo`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetInfoResult {
    /// Target description.
    pub target_info: TargetInfo,
}

/// Parameters for `Target.getTargets`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct GetTargetsParams {
    /// Optional type filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<TargetFilterEntry>>,
}

/// One entry of a target type filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFilterEntry {
    /// Type to match; absent matches all.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    /// Exclude rather than include matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<bool>,
}

/// Result of `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsResult {
    /// All known targets.
    pub target_infos: Vec<TargetInfo>,
}

/// Parameters for `Target.setDiscoverTargets`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDiscoverTargetsParams {
    /// Whether to emit discovery events.
    pub discover: bool,
}

/// Parameters for `Target.setAutoAttach`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAutoAttachParams {
    /// Attach to every target that appears.
    pub auto_attach: bool,
    /// Pause new targets in the debugger until resumed.
    pub wait_for_debugger_on_start: bool,
    /// Flat-session mode; always set by this client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

/// Event: `Target.targetCreated`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCreatedEvent {
    /// The new target.
    pub target_info: TargetInfo,
}

/// Event: `Target.targetInfoChanged`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfoChangedEvent {
    /// Updated target description.
    pub target_info: TargetInfo,
}

/// Event: `Target.targetDestroyed`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDestroyedEvent {
    /// Id of the destroyed target.
    pub target_id: String,
}

/// Event: `Target.targetCrashed`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCrashedEvent {
    /// Id of the crashed target.
    pub target_id: String,
    /// Crash status string.
    pub status: String,
    /// Process exit code.
    pub error_code: i64,
}

/// Event: `Target.attachedToTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedToTargetEvent {
    /// Session created by the attach.
    pub session_id: String,
    /// The attached target.
    pub target_info: TargetInfo,
    /// Whether the target is paused waiting for a debugger.
    pub waiting_for_debugger: bool,
}

/// Event: `Target.detachedFromTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachedFromTargetEvent {
    /// Session that went away.
    pub session_id: String,
}

#[cfg(test)]
mod tests;
