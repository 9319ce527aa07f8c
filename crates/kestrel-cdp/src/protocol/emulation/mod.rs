//! Emulation domain types.
//!
//! Device metrics, locale/timezone/geolocation overrides, and media
//! emulation.

use serde::Serialize;

/// Parameters for `Emulation.setDeviceMetricsOverride`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDeviceMetricsOverrideParams {
    /// Viewport width in CSS pixels; 0 disables the override.
    pub width: u32,
    /// Viewport height in CSS pixels; 0 disables the override.
    pub height: u32,
    /// Device scale factor; 0 keeps the default.
    pub device_scale_factor: f64,
    /// Emulate a mobile device (viewport meta, overlay scrollbars).
    pub mobile: bool,
}

/// Parameters for `Emulation.setTouchEmulationEnabled`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTouchEmulationEnabledParams {
    /// Whether touch events are emitted.
    pub enabled: bool,
    /// Maximum simultaneous touch points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_touch_points: Option<u32>,
}

/// Parameters for `Emulation.setLocaleOverride`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetLocaleOverrideParams {
    /// ICU locale, e.g. `de-DE`; absent restores the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Parameters for `Emulation.setTimezoneOverride`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTimezoneOverrideParams {
    /// IANA timezone id, e.g. `Europe/Berlin`; empty restores default.
    pub timezone_id: String,
}

/// Parameters for `Emulation.setGeolocationOverride`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetGeolocationOverrideParams {
    /// Latitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Accuracy in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// One emulated media feature.
#[derive(Debug, Clone, Serialize)]
pub struct MediaFeature {
    /// Feature name, e.g. `prefers-color-scheme`.
    pub name: String,
    /// Feature value, e.g. `dark`.
    pub value: String,
}

/// Parameters for `Emulation.setEmulatedMedia`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetEmulatedMediaParams {
    /// Media type (`screen`, `print`); empty restores default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Media features to emulate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<MediaFeature>>,
}

/// Parameters for `Emulation.setScriptExecutionDisabled`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScriptExecutionDisabledParams {
    /// Whether page scripts are blocked from running.
    pub value: bool,
}

/// Parameters for `Emulation.setUserAgentOverride`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetUserAgentOverrideParams {
    /// User agent string.
    pub user_agent: String,
    /// `Accept-Language` header override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
    /// `navigator.platform` override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}
