//! Per-context configuration.

use std::collections::HashMap;

use crate::cookies::CookieRecord;
use crate::page::emulation::Viewport;

/// Geolocation override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geolocation {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Accuracy in meters.
    pub accuracy: f64,
}

/// Options applied to every page of a context.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Viewport override.
    pub viewport: Option<Viewport>,
    /// User agent override.
    pub user_agent: Option<String>,
    /// ICU locale, e.g. `de-DE`.
    pub locale: Option<String>,
    /// IANA timezone id, e.g. `Europe/Berlin`.
    pub timezone_id: Option<String>,
    /// Geolocation override.
    pub geolocation: Option<Geolocation>,
    /// Permission names granted to the context.
    pub permissions: Vec<String>,
    /// Headers added to every request.
    pub extra_http_headers: HashMap<String, String>,
    /// Start pages offline.
    pub offline: bool,
    /// Proxy server override for the context.
    pub proxy: Option<String>,
    /// Accept invalid TLS certificates.
    pub ignore_https_errors: bool,
    /// Whether page JavaScript runs; defaults to enabled.
    pub javascript_enabled: bool,
    /// Bypass page CSP for injected scripts.
    pub bypass_csp: bool,
    /// Cookies seeded into the context at creation.
    pub storage_state_cookies: Vec<CookieRecord>,
}

impl ContextOptions {
    /// Defaults: no overrides, JavaScript enabled.
    pub fn new() -> Self {
        Self {
            javascript_enabled: true,
            ..Self::default()
        }
    }

    /// Builder entry point.
    pub fn builder() -> ContextOptionsBuilder {
        ContextOptionsBuilder {
            options: Self::new(),
        }
    }
}

/// Builder for [`ContextOptions`].
#[derive(Debug, Clone)]
pub struct ContextOptionsBuilder {
    options: ContextOptions,
}

impl ContextOptionsBuilder {
    /// Set the viewport.
    #[must_use]
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.options.viewport = Some(Viewport {
            width,
            height,
            ..Viewport::default()
        });
        self
    }

    /// Set the full viewport description.
    #[must_use]
    pub fn viewport_full(mut self, viewport: Viewport) -> Self {
        self.options.viewport = Some(viewport);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = Some(user_agent.into());
        self
    }

    /// Set the locale.
    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.options.locale = Some(locale.into());
        self
    }

    /// Set the timezone.
    #[must_use]
    pub fn timezone(mut self, timezone_id: impl Into<String>) -> Self {
        self.options.timezone_id = Some(timezone_id.into());
        self
    }

    /// Set the geolocation.
    #[must_use]
    pub fn geolocation(mut self, latitude: f64, longitude: f64) -> Self {
        self.options.geolocation = Some(Geolocation {
            latitude,
            longitude,
            accuracy: 1.0,
        });
        self
    }

    /// Grant permissions, e.g. `geolocation`, `notifications`.
    #[must_use]
    pub fn permissions(mut self, permissions: impl IntoIterator<Item = String>) -> Self {
        self.options.permissions.extend(permissions);
        self
    }

    /// Add an extra header.
    #[must_use]
    pub fn extra_http_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.options
            .extra_http_headers
            .insert(name.into(), value.into());
        self
    }

    /// Start offline.
    #[must_use]
    pub fn offline(mut self, offline: bool) -> Self {
        self.options.offline = offline;
        self
    }

    /// Set a proxy override.
    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.options.proxy = Some(proxy.into());
        self
    }

    /// Accept invalid TLS certificates.
    #[must_use]
    pub fn ignore_https_errors(mut self, ignore: bool) -> Self {
        self.options.ignore_https_errors = ignore;
        self
    }

    /// Toggle page JavaScript.
    #[must_use]
    pub fn javascript_enabled(mut self, enabled: bool) -> Self {
        self.options.javascript_enabled = enabled;
        self
    }

    /// Bypass page CSP.
    #[must_use]
    pub fn bypass_csp(mut self, bypass: bool) -> Self {
        self.options.bypass_csp = bypass;
        self
    }

    /// Seed cookies at creation.
    #[must_use]
    pub fn storage_state_cookies(
        mut self,
        cookies: impl IntoIterator<Item = CookieRecord>,
    ) -> Self {
        self.options.storage_state_cookies.extend(cookies);
        self
    }

    /// Finish the builder.
    pub fn build(self) -> ContextOptions {
        self.options
    }
}
