//! Page domain types.
//!
//! Navigation, lifecycle, document content, and per-document scripts.

use serde::{Deserialize, Serialize};

/// Parameters for `Page.navigate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    /// URL to navigate to.
    pub url: String,
    /// Referrer to send with the navigation request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Transition type hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_type: Option<String>,
    /// Frame to navigate; defaults to the main frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
}

/// Result of `Page.navigate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResult {
    /// Frame the navigation happened in.
    pub frame_id: String,
    /// Loader id of the navigation, absent for same-document moves.
    pub loader_id: Option<String>,
    /// Error text when the navigation failed at the network layer,
    /// e.g. `net::ERR_NAME_NOT_RESOLVED`.
    pub error_text: Option<String>,
}

/// Parameters for `Page.reload`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReloadParams {
    /// Bypass the cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_cache: Option<bool>,
}

/// One entry of the navigation history.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
    /// Entry id, used with `Page.navigateToHistoryEntry`.
    pub id: i64,
    /// Entry URL.
    pub url: String,
    /// URL the user typed, if different.
    pub user_typed_url: Option<String>,
    /// Entry title.
    pub title: String,
    /// Transition that produced the entry.
    pub transition_type: Option<String>,
}

/// Result of `Page.getNavigationHistory`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNavigationHistoryResult {
    /// Index of the current entry.
    pub current_index: i64,
    /// All entries, oldest first.
    pub entries: Vec<NavigationEntry>,
}

/// Parameters for `Page.navigateToHistoryEntry`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateToHistoryEntryParams {
    /// Entry to make current.
    pub entry_id: i64,
}

/// Parameters for `Page.setDocumentContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDocumentContentParams {
    /// Frame whose document to replace.
    pub frame_id: String,
    /// HTML markup to install.
    pub html: String,
}

/// A frame in the frame tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Frame id.
    pub id: String,
    /// Parent frame id, absent for the main frame.
    pub parent_id: Option<String>,
    /// Loader id.
    pub loader_id: Option<String>,
    /// Frame URL.
    pub url: String,
    /// Security origin.
    pub security_origin: Option<String>,
    /// Document mime type.
    pub mime_type: Option<String>,
}

/// A node of the frame tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTree {
    /// This frame.
    pub frame: Frame,
    /// Child frames.
    pub child_frames: Option<Vec<FrameTree>>,
}

/// Result of `Page.getFrameTree`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFrameTreeResult {
    /// Root of the tree.
    pub frame_tree: FrameTree,
}

/// Parameters for `Page.addScriptToEvaluateOnNewDocument`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScriptToEvaluateOnNewDocumentParams {
    /// Script source to run before any document script.
    pub source: String,
}

/// Result of `Page.addScriptToEvaluateOnNewDocument`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScriptToEvaluateOnNewDocumentResult {
    /// Identifier for later removal.
    pub identifier: String,
}

/// Parameters for `Page.removeScriptToEvaluateOnNewDocument`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveScriptToEvaluateOnNewDocumentParams {
    /// Identifier returned on registration.
    pub identifier: String,
}

/// Parameters for `Page.setBypassCSP`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBypassCspParams {
    /// Whether to bypass page CSP.
    pub enabled: bool,
}

/// Event: `Page.lifecycleEvent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    /// Frame the event belongs to.
    pub frame_id: String,
    /// Loader id.
    pub loader_id: String,
    /// Lifecycle phase name (`init`, `DOMContentLoaded`, `load`,
    /// `networkIdle`, ...).
    pub name: String,
    /// Monotonic timestamp.
    pub timestamp: f64,
}

/// Event: `Page.frameNavigated`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameNavigatedEvent {
    /// The frame after navigation.
    pub frame: Frame,
}

/// Event: `Page.javascriptDialogOpening`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavascriptDialogOpeningEvent {
    /// Page URL.
    pub url: String,
    /// Dialog message.
    pub message: String,
    /// Dialog type (`alert`, `confirm`, `prompt`, `beforeunload`).
    #[serde(rename = "type")]
    pub dialog_type: String,
}
