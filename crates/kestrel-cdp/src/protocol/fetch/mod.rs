//! Fetch domain types.
//!
//! Request interception: pausing, fulfilling, failing, and continuing
//! in-flight requests.

use serde::{Deserialize, Serialize};

use super::network::Request;

/// A pattern selecting which requests pause.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    /// URL wildcard pattern; `*` matches everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    /// Restrict to a resource type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Pause at `Request` or `Response` stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_stage: Option<String>,
}

/// Parameters for `Fetch.enable`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {
    /// Patterns to intercept; empty intercepts nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<RequestPattern>>,
}

/// Event: `Fetch.requestPaused`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPausedEvent {
    /// Interception id, used to resolve the pause.
    pub request_id: String,
    /// The paused request.
    pub request: Request,
    /// Frame the request belongs to.
    pub frame_id: String,
    /// Resource type string.
    pub resource_type: String,
    /// Network-layer id when available, for correlation with the
    /// Network domain.
    pub network_id: Option<String>,
    /// Status code when paused at the response stage.
    pub response_status_code: Option<i64>,
}

/// One header entry for fulfill/continue.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderEntry {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Parameters for `Fetch.fulfillRequest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillRequestParams {
    /// Interception id.
    pub request_id: String,
    /// Response status code.
    pub response_code: i64,
    /// Response headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<Vec<HeaderEntry>>,
    /// Base64-encoded body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Network-level error reasons for `Fetch.failRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorReason {
    /// Generic failure.
    Failed,
    /// Aborted by the client.
    Aborted,
    /// Timed out.
    TimedOut,
    /// Access denied.
    AccessDenied,
    /// Connection closed.
    ConnectionClosed,
    /// Connection reset.
    ConnectionReset,
    /// Connection refused.
    ConnectionRefused,
    /// Connection aborted.
    ConnectionAborted,
    /// Connection failed.
    ConnectionFailed,
    /// DNS resolution failed.
    NameNotResolved,
    /// No network.
    InternetDisconnected,
    /// Address unreachable.
    AddressUnreachable,
    /// Blocked by the client.
    BlockedByClient,
    /// Blocked by the response.
    BlockedByResponse,
}

/// Parameters for `Fetch.failRequest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailRequestParams {
    /// Interception id.
    pub request_id: String,
    /// Failure to report to the page.
    pub error_reason: ErrorReason,
}

/// Parameters for `Fetch.continueRequest`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContinueRequestParams {
    /// Interception id.
    pub request_id: String,
    /// Override the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Override the method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Override the POST body, base64-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_data: Option<String>,
    /// Override the headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<HeaderEntry>>,
}
