//! CDP endpoint discovery via the HTTP side-channel.
//!
//! Chromium exposes `http://<host>:<port>/json/version`; the browser-level
//! WebSocket URL appears in its `webSocketDebuggerUrl` field once the
//! DevTools server is up. [`discover_websocket_url`] performs a single
//! fetch; [`poll_websocket_url`] retries until the URL appears or the
//! deadline elapses, which is what a freshly spawned browser needs.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, trace};
use url::Url;

use crate::error::CdpError;

/// Default deadline for a single discovery fetch.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between polls while the DevTools server is coming up.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Response shape of the `/json/version` endpoint.
///
/// Chromium serves most of these keys with dashes and capitals.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersionInfo {
    /// Browser product and version, e.g. `Chrome/130.0.6723.58`.
    #[serde(rename = "Browser")]
    pub browser: Option<String>,
    /// DevTools protocol version.
    #[serde(rename = "Protocol-Version")]
    pub protocol_version: Option<String>,
    /// User agent string the browser reports.
    #[serde(rename = "User-Agent")]
    pub user_agent: Option<String>,
    /// WebKit version.
    #[serde(rename = "WebKit-Version")]
    pub webkit_version: Option<String>,
    /// Browser-level WebSocket URL; absent until the server is ready.
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: Option<String>,
}

/// Options for endpoint discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Overall deadline for discovery.
    pub timeout: Option<Duration>,
    /// Extra headers for the HTTP request.
    pub headers: HashMap<String, String>,
}

impl DiscoveryOptions {
    /// Create options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the discovery deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a custom header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Resolve the browser-level WebSocket URL from an endpoint.
///
/// `ws://`/`wss://` URLs are returned as-is; `http://`/`https://` URLs are
/// resolved through one `/json/version` fetch.
///
/// # Errors
///
/// Returns an error if the URL is invalid, the request fails, or the
/// response has no `webSocketDebuggerUrl`.
#[instrument(level = "info", skip(options))]
pub async fn discover_websocket_url(
    endpoint_url: &str,
    options: &DiscoveryOptions,
) -> Result<String, CdpError> {
    let base_url = parse_endpoint(endpoint_url)?;
    if base_url.scheme() == "ws" || base_url.scheme() == "wss" {
        debug!("URL is already a WebSocket URL, returning as-is");
        return Ok(endpoint_url.to_string());
    }

    let version = fetch_version(&base_url, options).await?;
    let ws_url = version
        .web_socket_debugger_url
        .ok_or_else(|| CdpError::EndpointDiscoveryFailed {
            url: endpoint_url.to_string(),
            reason: "response missing webSocketDebuggerUrl field".to_string(),
        })?;

    info!(ws_url = %ws_url, browser = ?version.browser, "Discovered WebSocket URL");
    Ok(ws_url)
}

/// Poll `/json/version` until the WebSocket URL appears.
///
/// Used after spawning a browser: the HTTP server may refuse connections
/// for a while, then answer without a URL, then become ready. Connection
/// refusals and incomplete responses are retried until the deadline.
///
/// # Errors
///
/// Returns `DiscoveryTimeout` if the deadline elapses first.
#[instrument(level = "info", skip(options))]
pub async fn poll_websocket_url(
    endpoint_url: &str,
    options: &DiscoveryOptions,
) -> Result<String, CdpError> {
    let base_url = parse_endpoint(endpoint_url)?;
    if base_url.scheme() == "ws" || base_url.scheme() == "wss" {
        return Ok(endpoint_url.to_string());
    }

    let deadline = options.timeout.unwrap_or(DEFAULT_DISCOVERY_TIMEOUT);
    let started = Instant::now();

    loop {
        match fetch_version(&base_url, options).await {
            Ok(version) => {
                if let Some(ws_url) = version.web_socket_debugger_url {
                    info!(ws_url = %ws_url, elapsed_ms = started.elapsed().as_millis(), "Discovered WebSocket URL");
                    return Ok(ws_url);
                }
                trace!("DevTools server up but no WebSocket URL yet");
            }
            Err(CdpError::InvalidEndpointUrl(e)) => {
                return Err(CdpError::InvalidEndpointUrl(e));
            }
            Err(e) => {
                trace!(error = %e, "Discovery poll failed, retrying");
            }
        }

        if started.elapsed() >= deadline {
            return Err(CdpError::DiscoveryTimeout(deadline));
        }
        sleep(POLL_INTERVAL).await;
    }
}

fn parse_endpoint(endpoint_url: &str) -> Result<Url, CdpError> {
    let url = Url::parse(endpoint_url)
        .map_err(|e| CdpError::InvalidEndpointUrl(format!("{endpoint_url}: {e}")))?;
    match url.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(url),
        other => Err(CdpError::InvalidEndpointUrl(format!(
            "expected http, https, ws, or wss scheme, got: {other}"
        ))),
    }
}

async fn fetch_version(
    base_url: &Url,
    options: &DiscoveryOptions,
) -> Result<BrowserVersionInfo, CdpError> {
    let version_url = base_url
        .join("/json/version")
        .map_err(|e| CdpError::InvalidEndpointUrl(format!("failed to build version URL: {e}")))?;

    let timeout = options.timeout.unwrap_or(DEFAULT_DISCOVERY_TIMEOUT);
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CdpError::HttpRequestFailed(e.to_string()))?;

    let mut request = client.get(version_url.as_str());
    for (name, value) in &options.headers {
        request = request.header(name, value);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_connect() {
            CdpError::ConnectionFailed(format!("failed to connect to {base_url}: {e}"))
        } else {
            CdpError::HttpRequestFailed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(CdpError::EndpointDiscoveryFailed {
            url: base_url.to_string(),
            reason: format!("HTTP status {}", response.status()),
        });
    }

    response
        .json()
        .await
        .map_err(|e| CdpError::EndpointDiscoveryFailed {
            url: base_url.to_string(),
            reason: format!("failed to parse response: {e}"),
        })
}

#[cfg(test)]
mod tests;
