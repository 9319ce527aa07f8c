//! Network domain types.
//!
//! Request/response observation, cookies, and network conditions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for `Network.enable`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {
    /// Longest POST body to buffer, in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_post_data_size: Option<u64>,
    /// Per-resource buffer size, in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resource_buffer_size: Option<u64>,
    /// Total buffer size, in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_total_buffer_size: Option<u64>,
}

/// A request as seen on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// POST body when captured.
    pub post_data: Option<String>,
    /// Whether a POST body exists, even if not captured.
    pub has_post_data: Option<bool>,
}

/// Certificate information of a secure response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDetails {
    /// Negotiated protocol, e.g. `TLS 1.3`.
    pub protocol: String,
    /// Certificate subject.
    pub subject_name: String,
    /// Certificate issuer.
    pub issuer: String,
    /// Validity start, seconds since epoch.
    pub valid_from: f64,
    /// Validity end, seconds since epoch.
    pub valid_to: f64,
}

/// Detailed timing of one exchange, all values in milliseconds relative
/// to `request_time`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTiming {
    /// Baseline in seconds.
    pub request_time: f64,
    /// DNS start.
    pub dns_start: f64,
    /// DNS end.
    pub dns_end: f64,
    /// Connect start.
    pub connect_start: f64,
    /// Connect end.
    pub connect_end: f64,
    /// TLS start.
    pub ssl_start: f64,
    /// TLS end.
    pub ssl_end: f64,
    /// Send start.
    pub send_start: f64,
    /// Send end.
    pub send_end: f64,
    /// First byte of the response.
    pub receive_headers_end: f64,
}

/// A response as seen on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Response URL.
    pub url: String,
    /// HTTP status.
    pub status: i64,
    /// HTTP status text.
    pub status_text: String,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Mime type.
    pub mime_type: String,
    /// Remote IP address.
    #[serde(rename = "remoteIPAddress")]
    pub remote_ip_address: Option<String>,
    /// Remote port.
    pub remote_port: Option<u16>,
    /// Served from the disk cache.
    pub from_disk_cache: Option<bool>,
    /// Served by a service worker.
    pub from_service_worker: Option<bool>,
    /// Timing block, absent for cached responses.
    pub timing: Option<ResourceTiming>,
    /// TLS details for secure responses.
    pub security_details: Option<SecurityDetails>,
}

/// Request initiator description.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiator {
    /// Initiator type (`parser`, `script`, `other`, ...).
    #[serde(rename = "type")]
    pub initiator_type: String,
    /// Initiating URL, when known.
    pub url: Option<String>,
}

/// Event: `Network.requestWillBeSent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSentEvent {
    /// Exchange id, stable across the request's events.
    pub request_id: String,
    /// Loader id.
    pub loader_id: Option<String>,
    /// Document URL.
    pub document_url: Option<String>,
    /// The request.
    pub request: Request,
    /// Monotonic timestamp, seconds.
    pub timestamp: f64,
    /// Wall-clock time, seconds since epoch.
    pub wall_time: f64,
    /// Initiator description.
    pub initiator: Option<Initiator>,
    /// Response data for the redirect hop this request replaces.
    pub redirect_response: Option<Response>,
    /// Resource type string (`Document`, `XHR`, ...).
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    /// Frame issuing the request.
    pub frame_id: Option<String>,
}

/// Event: `Network.requestWillBeSentExtraInfo`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSentExtraInfoEvent {
    /// Exchange id.
    pub request_id: String,
    /// Raw request headers, including cookies.
    pub headers: HashMap<String, String>,
}

/// Event: `Network.responseReceived`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceivedEvent {
    /// Exchange id.
    pub request_id: String,
    /// Monotonic timestamp, seconds.
    pub timestamp: f64,
    /// Resource type string.
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    /// The response.
    pub response: Response,
    /// Frame receiving the response.
    pub frame_id: Option<String>,
}

/// Event: `Network.responseReceivedExtraInfo`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceivedExtraInfoEvent {
    /// Exchange id.
    pub request_id: String,
    /// Raw response headers, including all `Set-Cookie` lines.
    pub headers: HashMap<String, String>,
}

/// Event: `Network.loadingFinished`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFinishedEvent {
    /// Exchange id.
    pub request_id: String,
    /// Monotonic timestamp, seconds.
    pub timestamp: f64,
    /// Total encoded bytes received.
    pub encoded_data_length: f64,
}

/// Event: `Network.loadingFailed`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFailedEvent {
    /// Exchange id.
    pub request_id: String,
    /// Monotonic timestamp, seconds.
    pub timestamp: f64,
    /// Failure description, e.g. `net::ERR_CONNECTION_REFUSED`.
    pub error_text: String,
    /// Whether the request was canceled.
    pub canceled: Option<bool>,
}

/// Event: `Network.dataReceived`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataReceivedEvent {
    /// Exchange id.
    pub request_id: String,
    /// Monotonic timestamp, seconds.
    pub timestamp: f64,
    /// Bytes in this chunk after decoding.
    pub data_length: u64,
    /// Bytes in this chunk as transferred.
    pub encoded_data_length: u64,
}

/// Parameters for `Network.getResponseBody`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponseBodyParams {
    /// Exchange whose body to fetch.
    pub request_id: String,
}

/// Result of `Network.getResponseBody`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponseBodyResult {
    /// Body payload, possibly base64-encoded.
    pub body: String,
    /// Whether `body` is base64-encoded.
    pub base64_encoded: bool,
}

/// Cookie same-site policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CookieSameSite {
    /// Sent only on same-site requests.
    Strict,
    /// Sent on same-site requests and top-level cross-site navigations.
    Lax,
    /// Sent everywhere; requires `Secure`.
    None,
}

/// A cookie as reported by the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Cookie domain.
    pub domain: String,
    /// Cookie path.
    pub path: String,
    /// Expiry, seconds since epoch; negative for session cookies.
    pub expires: f64,
    /// HTTP-only flag.
    pub http_only: bool,
    /// Secure flag.
    pub secure: bool,
    /// Same-site policy.
    pub same_site: Option<CookieSameSite>,
    /// Cookie priority (`Low`, `Medium`, `High`).
    pub priority: Option<String>,
}

/// A cookie to install via `Network.setCookie`/`Storage.setCookies`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CookieParam {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// URL to derive default domain/path from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Cookie domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Cookie path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Secure flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    /// HTTP-only flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    /// Same-site policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<CookieSameSite>,
    /// Expiry, seconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    /// Cookie priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl CookieParam {
    /// A cookie named `name` with `value`; scope fields default.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Set the domain.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the expiry.
    #[must_use]
    pub fn expires(mut self, expires: f64) -> Self {
        self.expires = Some(expires);
        self
    }
}

/// Parameters for `Network.getCookies`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetCookiesParams {
    /// Restrict to cookies applicable to these URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

/// Result of `Network.getCookies`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCookiesResult {
    /// Matching cookies.
    pub cookies: Vec<Cookie>,
}

/// Parameters for `Network.deleteCookies`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCookiesParams {
    /// Name of the cookies to delete.
    pub name: String,
    /// Restrict by URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Restrict by domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Restrict by path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Parameters for `Network.setExtraHTTPHeaders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExtraHttpHeadersParams {
    /// Headers added to every request of the session.
    pub headers: HashMap<String, String>,
}

/// Parameters for `Network.emulateNetworkConditions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmulateNetworkConditionsParams {
    /// Simulate a dropped connection.
    pub offline: bool,
    /// Added latency, milliseconds.
    pub latency: f64,
    /// Download throughput, bytes/s; -1 disables throttling.
    pub download_throughput: f64,
    /// Upload throughput, bytes/s; -1 disables throttling.
    pub upload_throughput: f64,
}

impl EmulateNetworkConditionsParams {
    /// Toggle offline emulation without throttling.
    pub fn offline(offline: bool) -> Self {
        Self {
            offline,
            latency: 0.0,
            download_throughput: -1.0,
            upload_throughput: -1.0,
        }
    }
}

/// Catch-all for `Network.*` acks with no interesting payload.
pub type EmptyResult = Value;
