//! Browser domain types.
//!
//! Version info, window bounds, permissions, and download behavior.

use serde::{Deserialize, Serialize};

/// Result of `Browser.getVersion`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVersionResult {
    /// DevTools protocol version.
    pub protocol_version: String,
    /// Product name and version.
    pub product: String,
    /// Revision string.
    pub revision: String,
    /// User agent the browser reports.
    pub user_agent: String,
    /// JavaScript engine version.
    pub js_version: String,
}

/// Window bounds.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Left edge, screen pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<i64>,
    /// Top edge, screen pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<i64>,
    /// Width, screen pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    /// Height, screen pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    /// Window state (`normal`, `minimized`, `maximized`, `fullscreen`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_state: Option<String>,
}

/// Parameters for `Browser.getWindowForTarget`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetWindowForTargetParams {
    /// Target whose window to look up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

/// Result of `Browser.getWindowForTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWindowForTargetResult {
    /// Window id.
    pub window_id: i64,
    /// Current bounds.
    pub bounds: Bounds,
}

/// Parameters for `Browser.setWindowBounds`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetWindowBoundsParams {
    /// Window to mutate.
    pub window_id: i64,
    /// New bounds; unset fields keep their value.
    pub bounds: Bounds,
}

/// Parameters for `Browser.grantPermissions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionsParams {
    /// Permission names, e.g. `geolocation`.
    pub permissions: Vec<String>,
    /// Restrict the grant to an origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Context the grant applies to; absent means the default context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}

/// Parameters for `Browser.resetPermissions`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResetPermissionsParams {
    /// Context whose grants to drop; absent means the default context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}

/// Parameters for `Browser.setDownloadBehavior`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDownloadBehaviorParams {
    /// Behavior (`deny`, `allow`, `allowAndName`, `default`).
    pub behavior: String,
    /// Context the behavior applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
    /// Directory for `allow` modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
}

#[cfg(test)]
mod tests;
