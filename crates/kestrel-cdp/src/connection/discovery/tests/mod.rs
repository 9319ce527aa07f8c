//! Tests for endpoint discovery.

use std::time::Duration;

use super::*;

#[tokio::test]
async fn websocket_url_passes_through() {
    let options = DiscoveryOptions::default();
    let result =
        discover_websocket_url("ws://localhost:9222/devtools/browser/abc123", &options).await;
    assert_eq!(
        result.unwrap(),
        "ws://localhost:9222/devtools/browser/abc123"
    );
}

#[tokio::test]
async fn invalid_scheme_is_rejected() {
    let options = DiscoveryOptions::default();
    let result = discover_websocket_url("ftp://localhost:9222", &options).await;
    assert!(matches!(result, Err(CdpError::InvalidEndpointUrl(_))));
}

#[tokio::test]
async fn poll_rejects_invalid_scheme_without_retrying() {
    let options = DiscoveryOptions::new().timeout(Duration::from_secs(5));
    let result = poll_websocket_url("file:///nope", &options).await;
    assert!(matches!(result, Err(CdpError::InvalidEndpointUrl(_))));
}

#[tokio::test]
async fn poll_times_out_against_dead_endpoint() {
    // Port 1 is essentially guaranteed to refuse connections.
    let options = DiscoveryOptions::new().timeout(Duration::from_millis(300));
    let started = std::time::Instant::now();
    let result = poll_websocket_url("http://127.0.0.1:1", &options).await;
    assert!(matches!(result, Err(CdpError::DiscoveryTimeout(_))));
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[test]
fn options_builder_collects_headers() {
    let options = DiscoveryOptions::new()
        .timeout(Duration::from_secs(10))
        .header("Authorization", "Bearer token")
        .header("X-Custom", "value");

    assert_eq!(options.timeout, Some(Duration::from_secs(10)));
    assert_eq!(
        options.headers.get("Authorization"),
        Some(&"Bearer token".to_string())
    );
    assert_eq!(options.headers.get("X-Custom"), Some(&"value".to_string()));
}

#[test]
fn version_info_parses_chromium_payload() {
    let raw = r#"{
        "Browser": "Chrome/130.0.6723.58",
        "Protocol-Version": "1.3",
        "User-Agent": "Mozilla/5.0",
        "WebKit-Version": "537.36",
        "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/uuid"
    }"#;
    let info: BrowserVersionInfo = serde_json::from_str(raw).unwrap();
    assert_eq!(info.browser.as_deref(), Some("Chrome/130.0.6723.58"));
    assert_eq!(info.protocol_version.as_deref(), Some("1.3"));
    assert!(info.web_socket_debugger_url.unwrap().starts_with("ws://"));
}

#[test]
fn version_info_tolerates_missing_url() {
    let info: BrowserVersionInfo = serde_json::from_str("{}").unwrap();
    assert!(info.web_socket_debugger_url.is_none());
}
