//! Per-page emulation overrides.

use std::collections::HashMap;

use kestrel_cdp::protocol::emulation::{
    MediaFeature, SetDeviceMetricsOverrideParams, SetEmulatedMediaParams,
    SetGeolocationOverrideParams, SetLocaleOverrideParams, SetScriptExecutionDisabledParams,
    SetTimezoneOverrideParams, SetTouchEmulationEnabledParams,
};
use kestrel_cdp::protocol::network::{EmulateNetworkConditionsParams, SetExtraHttpHeadersParams};
use kestrel_cdp::protocol::page::SetBypassCspParams;

use super::Page;
use crate::error::PageError;

/// Viewport dimensions and device characteristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: u32,
    /// Height in CSS pixels.
    pub height: u32,
    /// Device scale factor.
    pub device_scale_factor: f64,
    /// Emulate a mobile device.
    pub mobile: bool,
    /// Emit touch events.
    pub touch: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_scale_factor: 1.0,
            mobile: false,
            touch: false,
        }
    }
}

impl Page {
    /// Override viewport metrics and touch emulation.
    pub async fn set_viewport(&self, viewport: Viewport) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>(
                "Emulation.setDeviceMetricsOverride",
                Some(SetDeviceMetricsOverrideParams {
                    width: viewport.width,
                    height: viewport.height,
                    device_scale_factor: viewport.device_scale_factor,
                    mobile: viewport.mobile,
                }),
            )
            .await?;
        session
            .send_command::<_, serde_json::Value>(
                "Emulation.setTouchEmulationEnabled",
                Some(SetTouchEmulationEnabledParams {
                    enabled: viewport.touch,
                    max_touch_points: viewport.touch.then_some(1),
                }),
            )
            .await?;
        Ok(())
    }

    /// Add headers to every request from this page.
    pub async fn set_extra_http_headers(
        &self,
        headers: HashMap<String, String>,
    ) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>(
                "Network.setExtraHTTPHeaders",
                Some(SetExtraHttpHeadersParams { headers }),
            )
            .await?;
        Ok(())
    }

    /// Toggle offline network emulation.
    pub async fn set_offline(&self, offline: bool) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>(
                "Network.emulateNetworkConditions",
                Some(EmulateNetworkConditionsParams::offline(offline)),
            )
            .await?;
        Ok(())
    }

    /// Override the reported geolocation.
    pub async fn set_geolocation(
        &self,
        latitude: f64,
        longitude: f64,
        accuracy: f64,
    ) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>(
                "Emulation.setGeolocationOverride",
                Some(SetGeolocationOverrideParams {
                    latitude: Some(latitude),
                    longitude: Some(longitude),
                    accuracy: Some(accuracy),
                }),
            )
            .await?;
        Ok(())
    }

    /// Override the ICU locale.
    pub async fn set_locale(&self, locale: Option<&str>) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>(
                "Emulation.setLocaleOverride",
                Some(SetLocaleOverrideParams {
                    locale: locale.map(str::to_string),
                }),
            )
            .await?;
        Ok(())
    }

    /// Override the timezone; empty restores the default.
    pub async fn set_timezone(&self, timezone_id: &str) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>(
                "Emulation.setTimezoneOverride",
                Some(SetTimezoneOverrideParams {
                    timezone_id: timezone_id.to_string(),
                }),
            )
            .await?;
        Ok(())
    }

    /// Emulate CSS media type and features.
    pub async fn emulate_media(
        &self,
        media: Option<&str>,
        color_scheme: Option<&str>,
        reduced_motion: Option<&str>,
    ) -> Result<(), PageError> {
        let session = self.session().await?;
        let mut features = Vec::new();
        if let Some(scheme) = color_scheme {
            features.push(MediaFeature {
                name: "prefers-color-scheme".to_string(),
                value: scheme.to_string(),
            });
        }
        if let Some(motion) = reduced_motion {
            features.push(MediaFeature {
                name: "prefers-reduced-motion".to_string(),
                value: motion.to_string(),
            });
        }

        session
            .send_command::<_, serde_json::Value>(
                "Emulation.setEmulatedMedia",
                Some(SetEmulatedMediaParams {
                    media: media.map(str::to_string),
                    features: (!features.is_empty()).then_some(features),
                }),
            )
            .await?;
        Ok(())
    }

    /// Block or allow script execution on the page.
    pub async fn set_javascript_enabled(&self, enabled: bool) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>(
                "Emulation.setScriptExecutionDisabled",
                Some(SetScriptExecutionDisabledParams { value: !enabled }),
            )
            .await?;
        Ok(())
    }

    /// Override the user agent for this page's session.
    pub async fn set_user_agent(&self, user_agent: &str) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>(
                "Emulation.setUserAgentOverride",
                Some(kestrel_cdp::protocol::emulation::SetUserAgentOverrideParams {
                    user_agent: user_agent.to_string(),
                    accept_language: None,
                    platform: None,
                }),
            )
            .await?;
        Ok(())
    }

    /// Bypass page CSP for injected scripts.
    pub async fn set_bypass_csp(&self, enabled: bool) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>(
                "Page.setBypassCSP",
                Some(SetBypassCspParams { enabled }),
            )
            .await?;
        Ok(())
    }
}
