//! Session-mode HTTP client.
//!
//! The HTTP side of the dual-mode engine: a reqwest-backed client whose
//! cookie jar is a [`CookieStore`], making cookie state enumerable and
//! therefore synchronizable with the browser side. Redirects are
//! followed manually so every hop's `Set-Cookie` lands in the jar and
//! the hop history is retained.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::cookies::{CookieRecord, CookieStore, SameSite};
use crate::error::HttpError;

/// Default per-request deadline.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirect hops before giving up.
const MAX_REDIRECTS: usize = 10;

/// A TLS/header impersonation profile for session-mode requests.
///
/// Carries what the core needs to push into an HTTP client; the actual
/// TLS-stack impersonation lives in the client implementation.
#[derive(Debug, Clone, Default)]
pub struct FingerprintProfile {
    /// User agent to present.
    pub user_agent: Option<String>,
    /// Default headers to present, in order.
    pub headers: Vec<(String, String)>,
}

/// One HTTP exchange's outcome.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects.
    pub url: String,
    /// Status code.
    pub status: u16,
    /// Response headers of the final hop.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
    /// Every URL visited, first request included.
    pub history: Vec<String>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Result<Value, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpError::Decode(e.to_string()))
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Best-effort `<title>` extraction from an HTML body.
    pub fn title(&self) -> Option<String> {
        let text = self.text();
        let lower = text.to_ascii_lowercase();
        let start = lower.find("<title")?;
        let open_end = text[start..].find('>')? + start + 1;
        let close = lower[open_end..].find("</title>")? + open_end;
        Some(text[open_end..close].trim().to_string())
    }
}

/// The HTTP client backing session mode.
pub struct SessionClient {
    client: parking_lot::RwLock<reqwest::Client>,
    jar: CookieStore,
    default_headers: parking_lot::RwLock<Vec<(String, String)>>,
    proxy: parking_lot::RwLock<Option<String>>,
    timeout: Duration,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("cookies", &self.jar.len())
            .finish_non_exhaustive()
    }
}

impl Default for SessionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClient {
    /// A client with default settings.
    pub fn new() -> Self {
        Self {
            client: parking_lot::RwLock::new(build_client(None, DEFAULT_TIMEOUT)),
            jar: CookieStore::new(),
            default_headers: parking_lot::RwLock::new(Vec::new()),
            proxy: parking_lot::RwLock::new(None),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// The client's cookie jar.
    pub fn jar(&self) -> &CookieStore {
        &self.jar
    }

    /// Replace the impersonation profile: user agent and default
    /// headers.
    pub fn set_fingerprint(&self, profile: &FingerprintProfile) {
        let mut headers = self.default_headers.write();
        headers.clear();
        if let Some(user_agent) = &profile.user_agent {
            headers.push(("User-Agent".to_string(), user_agent.clone()));
        }
        headers.extend(profile.headers.iter().cloned());
    }

    /// Set or clear the proxy; rebuilds the underlying client.
    pub fn set_proxy(&self, proxy: Option<String>) {
        *self.proxy.write() = proxy.clone();
        *self.client.write() = build_client(proxy.as_deref(), self.timeout);
    }

    /// Set one default header.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let mut headers = self.default_headers.write();
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        headers.push((name, value.into()));
    }

    /// Remove one default header.
    pub fn remove_header(&self, name: &str) {
        self.default_headers
            .write()
            .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Cookie snapshot as a simple name→value map.
    pub fn get_cookies(&self) -> HashMap<String, String> {
        self.jar
            .get_all()
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect()
    }

    /// Install simple name→value cookies under `domain`.
    pub fn set_cookies(&self, cookies: HashMap<String, String>, domain: &str) {
        self.jar.update_from_list(
            cookies
                .into_iter()
                .map(|(name, value)| CookieRecord::new(name, value, domain)),
        );
    }

    /// Delete every cookie named `name`.
    pub fn delete_cookie(&self, name: &str) {
        self.jar.delete(name, None, None);
    }

    /// Empty the jar.
    pub fn clear_cookies(&self) {
        self.jar.clear(None);
    }

    /// Start building a request.
    pub fn request(&self, method: impl Into<String>, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// GET shorthand.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request("GET", url)
    }

    /// POST shorthand.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request("POST", url)
    }

    /// PUT shorthand.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request("PUT", url)
    }

    /// PATCH shorthand.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request("PATCH", url)
    }

    /// DELETE shorthand.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request("DELETE", url)
    }

    /// HEAD shorthand.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request("HEAD", url)
    }

    #[instrument(level = "debug", skip(self, headers, body), fields(method = %method, url = %url))]
    async fn execute(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<Bytes>,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        let mut current_url =
            Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))?;
        let mut current_method = method.to_uppercase();
        let mut current_body = body;
        let mut history = Vec::new();

        for _hop in 0..=MAX_REDIRECTS {
            history.push(current_url.to_string());

            let reqwest_method = reqwest::Method::from_bytes(current_method.as_bytes())
                .map_err(|e| HttpError::Request(e.to_string()))?;
            let client = self.client.read().clone();
            let mut request = client
                .request(reqwest_method, current_url.clone())
                .timeout(timeout);

            for (name, value) in self.default_headers.read().iter() {
                request = request.header(name, value);
            }
            for (name, value) in headers {
                request = request.header(name, value);
            }

            // The jar, not reqwest, owns cookie selection.
            let cookie_header = cookie_header_for(&self.jar, current_url.as_str());
            if !cookie_header.is_empty() {
                request = request.header("Cookie", cookie_header);
            }
            if let Some(body) = &current_body {
                request = request.body(body.clone());
            }

            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(timeout)
                } else {
                    HttpError::Request(e.to_string())
                }
            })?;

            let status = response.status().as_u16();

            // Harvest cookies from this hop before deciding to follow.
            for value in response.headers().get_all("set-cookie") {
                if let Ok(raw) = value.to_str() {
                    match parse_set_cookie(raw, &current_url) {
                        Some(cookie) => self.jar.set(cookie),
                        None => warn!(raw, "Unparseable Set-Cookie header"),
                    }
                }
            }

            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if (300..400).contains(&status) && status != 304 {
                if let Some(location) = location {
                    let next = current_url
                        .join(&location)
                        .map_err(|e| HttpError::InvalidUrl(format!("{location}: {e}")))?;
                    trace!(status, next = %next, "Following redirect");
                    // 303, and the legacy 301/302-on-POST, downgrade to
                    // GET and drop the body.
                    if status == 303
                        || ((status == 301 || status == 302) && current_method == "POST")
                    {
                        current_method = "GET".to_string();
                        current_body = None;
                    }
                    current_url = next;
                    continue;
                }
            }

            let mut response_headers = HashMap::new();
            for (name, value) in response.headers() {
                if let Ok(value) = value.to_str() {
                    response_headers.insert(name.to_string(), value.to_string());
                }
            }
            let final_url = response.url().to_string();
            let body = response
                .bytes()
                .await
                .map_err(|e| HttpError::Request(e.to_string()))?;

            debug!(status, hops = history.len(), "Request complete");
            return Ok(HttpResponse {
                url: final_url,
                status,
                headers: response_headers,
                body,
                history,
            });
        }

        Err(HttpError::Request(format!(
            "too many redirects (> {MAX_REDIRECTS})"
        )))
    }
}

/// In-flight request configuration.
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    client: &'a SessionClient,
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl RequestBuilder<'_> {
    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// JSON body; sets `Content-Type`.
    #[must_use]
    pub fn json(mut self, value: &Value) -> Self {
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        self.body = Some(Bytes::from(value.to_string()));
        self
    }

    /// URL-encoded form body; sets `Content-Type`.
    #[must_use]
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in fields {
            serializer.append_pair(name, value);
        }
        self.headers.push((
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        ));
        self.body = Some(Bytes::from(serializer.finish()));
        self
    }

    /// Raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Per-request deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Execute the request.
    pub async fn send(self) -> Result<HttpResponse, HttpError> {
        let timeout = self.timeout.unwrap_or(self.client.timeout);
        self.client
            .execute(&self.method, &self.url, &self.headers, self.body, timeout)
            .await
    }
}

fn build_client(proxy: Option<&str>, timeout: Duration) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none());
    if let Some(proxy) = proxy {
        match reqwest::Proxy::all(proxy) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => warn!(proxy, error = %e, "Ignoring invalid proxy URL"),
        }
    }
    builder.build().unwrap_or_default()
}

/// Compose the `Cookie` header for `url` from the jar.
fn cookie_header_for(jar: &CookieStore, url: &str) -> String {
    jar.get_for_url(url)
        .into_iter()
        .map(|cookie| format!("{}={}", cookie.name, cookie.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse one `Set-Cookie` header into a record, defaulting scope from
/// the request URL.
fn parse_set_cookie(raw: &str, request_url: &Url) -> Option<CookieRecord> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut record = CookieRecord::new(
        name,
        value.trim(),
        request_url.host_str().unwrap_or_default(),
    );

    let mut max_age: Option<f64> = None;
    let mut expires: Option<f64> = None;

    for part in parts {
        let part = part.trim();
        let (attr, attr_value) = match part.split_once('=') {
            Some((attr, value)) => (attr.trim(), Some(value.trim())),
            None => (part, None),
        };

        match attr.to_ascii_lowercase().as_str() {
            "domain" => {
                if let Some(domain) = attr_value {
                    record.domain = domain.to_string();
                }
            }
            "path" => {
                if let Some(path) = attr_value {
                    record.path = path.to_string();
                }
            }
            "secure" => record.secure = true,
            "httponly" => record.http_only = true,
            "samesite" => {
                record.same_site = match attr_value.map(str::to_ascii_lowercase).as_deref() {
                    Some("strict") => SameSite::Strict,
                    Some("none") => SameSite::None,
                    _ => SameSite::Lax,
                };
            }
            "max-age" => {
                max_age = attr_value.and_then(|v| v.parse::<f64>().ok());
            }
            "expires" => {
                expires = attr_value
                    .and_then(|v| chrono::DateTime::parse_from_rfc2822(v).ok())
                    .map(|dt| dt.timestamp() as f64);
            }
            _ => {}
        }
    }

    // Max-Age wins over Expires per RFC 6265.
    record.expires = match max_age {
        Some(seconds) => Some(now_epoch() + seconds),
        None => expires,
    };

    Some(record)
}

fn now_epoch() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests;
