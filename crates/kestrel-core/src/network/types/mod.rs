//! Observed network exchange models.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use kestrel_cdp::protocol::network::ResourceTiming;

/// Resource kind as perceived by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// HTML document.
    Document,
    /// CSS stylesheet.
    Stylesheet,
    /// Image.
    Image,
    /// Audio/video.
    Media,
    /// Font.
    Font,
    /// JavaScript.
    Script,
    /// Text track.
    TextTrack,
    /// XMLHttpRequest.
    Xhr,
    /// Fetch API.
    Fetch,
    /// Prefetch.
    Prefetch,
    /// EventSource.
    EventSource,
    /// WebSocket.
    WebSocket,
    /// Web app manifest.
    Manifest,
    /// Signed exchange.
    SignedExchange,
    /// Ping.
    Ping,
    /// CSP violation report.
    CspViolationReport,
    /// CORS preflight.
    Preflight,
    /// Anything else.
    Other,
}

impl ResourceKind {
    /// Parse the CDP resource type string (`Document`, `XHR`, ...).
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "document" => Self::Document,
            "stylesheet" => Self::Stylesheet,
            "image" => Self::Image,
            "media" => Self::Media,
            "font" => Self::Font,
            "script" => Self::Script,
            "texttrack" => Self::TextTrack,
            "xhr" => Self::Xhr,
            "fetch" => Self::Fetch,
            "prefetch" => Self::Prefetch,
            "eventsource" => Self::EventSource,
            "websocket" => Self::WebSocket,
            "manifest" => Self::Manifest,
            "signedexchange" => Self::SignedExchange,
            "ping" => Self::Ping,
            "cspviolationreport" => Self::CspViolationReport,
            "preflight" => Self::Preflight,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Document => "document",
            Self::Stylesheet => "stylesheet",
            Self::Image => "image",
            Self::Media => "media",
            Self::Font => "font",
            Self::Script => "script",
            Self::TextTrack => "texttrack",
            Self::Xhr => "xhr",
            Self::Fetch => "fetch",
            Self::Prefetch => "prefetch",
            Self::EventSource => "eventsource",
            Self::WebSocket => "websocket",
            Self::Manifest => "manifest",
            Self::SignedExchange => "signedexchange",
            Self::Ping => "ping",
            Self::CspViolationReport => "cspviolationreport",
            Self::Preflight => "preflight",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
    /// PATCH.
    Patch,
    /// HEAD.
    Head,
    /// OPTIONS.
    Options,
    /// CONNECT.
    Connect,
    /// TRACE.
    Trace,
}

impl HttpMethod {
    /// Canonical uppercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured request.
#[derive(Debug, Clone)]
pub struct NetworkRequest {
    /// Exchange id, stable across the request's events.
    pub request_id: String,
    /// Request URL.
    pub url: String,
    /// HTTP method, uppercase.
    pub method: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// POST body when captured.
    pub post_data: Option<String>,
    /// Resource kind.
    pub resource_kind: ResourceKind,
    /// Wall-clock start, seconds since epoch.
    pub timestamp: f64,
}

impl NetworkRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this is an API-style request (XHR or Fetch).
    pub fn is_api(&self) -> bool {
        matches!(self.resource_kind, ResourceKind::Xhr | ResourceKind::Fetch)
    }
}

/// A captured response.
#[derive(Debug, Clone)]
pub struct NetworkResponse {
    /// Exchange id.
    pub request_id: String,
    /// Response URL.
    pub url: String,
    /// HTTP status.
    pub status: u16,
    /// HTTP status text.
    pub status_text: String,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Mime type.
    pub mime_type: String,
    /// Remote address, when known.
    pub remote_ip: Option<String>,
    /// Remote port, when known.
    pub remote_port: Option<u16>,
    /// Served from the disk cache.
    pub from_cache: bool,
    /// Served by a service worker.
    pub from_service_worker: bool,
    /// Wall-clock receive time, seconds since epoch.
    pub timestamp: f64,
}

impl NetworkResponse {
    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `Content-Type` header, falling back to the mime type.
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or(&self.mime_type)
    }
}

/// One observed exchange from request to completion.
///
/// An entry without `finished_at` is in-flight; terminal entries carry
/// either a response and a finish time, or an error.
#[derive(Debug, Clone)]
pub struct NetworkEntry {
    /// The request.
    pub request: NetworkRequest,
    /// The response, present once the status line arrived.
    pub response: Option<NetworkResponse>,
    /// Cached response body, present when capture succeeded.
    pub body: Option<Bytes>,
    /// Failure description for failed exchanges.
    pub error: Option<String>,
    /// CDP timing block, when captured.
    pub timing: Option<ResourceTiming>,
    /// Wall-clock start, seconds since epoch.
    pub started_at: f64,
    /// Wall-clock completion, seconds since epoch.
    pub finished_at: Option<f64>,
}

impl NetworkEntry {
    /// Exchange duration in milliseconds, once complete.
    pub fn duration_ms(&self) -> Option<f64> {
        self.finished_at
            .map(|finished| (finished - self.started_at) * 1000.0)
    }

    /// Whether the exchange reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Whether the exchange failed.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// A data chunk notification during streaming download.
#[derive(Debug, Clone)]
pub struct StreamingChunk {
    /// Exchange the chunk belongs to.
    pub request_id: String,
    /// Decoded chunk length in bytes.
    pub data_length: u64,
    /// Encoded (on-the-wire) chunk length in bytes.
    pub encoded_length: u64,
    /// Monotonic timestamp from the browser, seconds.
    pub timestamp: f64,
}

/// Match a URL against a glob pattern.
///
/// URL globs use shell-style wildcards: `*` (and `**`) match any
/// characters, slashes included, so `*httpbin*/status/200` matches
/// `https://httpbin.org/status/200`. `?` is kept literal because every
/// interesting URL has a query string.
pub(crate) fn glob_match(pattern: &str, url: &str) -> bool {
    let mut regex_pattern = String::with_capacity(pattern.len() * 2);
    regex_pattern.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                // Collapse `**` into one wildcard.
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                regex_pattern.push_str(".*");
            }
            '?' => regex_pattern.push_str("\\?"),
            '\\' => {
                if let Some(next) = chars.next() {
                    regex_pattern.push('\\');
                    regex_pattern.push(next);
                }
            }
            '.' | '+' | '^' | '$' | '(' | ')' | '[' | ']' | '{' | '}' | '|' => {
                regex_pattern.push('\\');
                regex_pattern.push(c);
            }
            _ => regex_pattern.push(c),
        }
    }

    regex_pattern.push('$');

    regex::Regex::new(&regex_pattern)
        .map(|re| re.is_match(url))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests;
