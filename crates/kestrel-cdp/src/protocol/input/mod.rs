//! Input domain types.
//!
//! Synthetic mouse and keyboard events.

use serde::Serialize;

/// Parameters for `Input.dispatchMouseEvent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchMouseEventParams {
    /// Event type (`mousePressed`, `mouseReleased`, `mouseMoved`,
    /// `mouseWheel`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// X in viewport CSS pixels.
    pub x: f64,
    /// Y in viewport CSS pixels.
    pub y: f64,
    /// Active modifier bitmask (Alt=1, Ctrl=2, Meta=4, Shift=8).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<u32>,
    /// Button (`left`, `middle`, `right`, `none`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
    /// Click count for press/release.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_count: Option<u32>,
    /// Wheel delta X.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    /// Wheel delta Y.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
}

/// Parameters for `Input.dispatchKeyEvent`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DispatchKeyEventParams {
    /// Event type (`keyDown`, `keyUp`, `rawKeyDown`, `char`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Active modifier bitmask.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<u32>,
    /// Text generated by the key, for printable keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Text when no modifiers are active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmodified_text: Option<String>,
    /// DOM `key` value, e.g. `Enter`, `a`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// DOM `code` value, e.g. `KeyA`, `Enter`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Windows virtual key code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_virtual_key_code: Option<u32>,
}
