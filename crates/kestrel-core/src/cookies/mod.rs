//! Unified cookie model shared by the browser and HTTP paths.
//!
//! [`CookieStore`] is the single source of truth for cookie state in
//! dual-mode operation. Records are keyed by `(domain, path, name)`;
//! lookups apply RFC 6265 matching (host-vs-domain suffix, path prefix,
//! secure-only-on-HTTPS) and prune expired records cooperatively — every
//! read path prunes, there is no background timer. All reads return
//! point-in-time snapshots so no lock is held across suspension points.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Cookie same-site policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SameSite {
    /// Sent only on same-site requests.
    Strict,
    /// Sent on same-site requests and top-level navigations.
    #[default]
    Lax,
    /// Sent everywhere; requires `secure`.
    None,
}

/// Cookie retention priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CookiePriority {
    /// Evicted first under pressure.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Evicted last under pressure.
    High,
}

/// A normalized cookie record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Cookie domain; a leading dot is equivalent to none.
    pub domain: String,
    /// Cookie path.
    pub path: String,
    /// Absolute expiry in seconds since epoch; `None` means session.
    pub expires: Option<f64>,
    /// HTTP-only flag.
    pub http_only: bool,
    /// Secure flag.
    pub secure: bool,
    /// Same-site policy.
    pub same_site: SameSite,
    /// Retention priority.
    pub priority: CookiePriority,
}

impl CookieRecord {
    /// A session cookie scoped to `domain` at path `/`.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: SameSite::default(),
            priority: CookiePriority::default(),
        }
    }

    /// Set the path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the absolute expiry.
    #[must_use]
    pub fn expires(mut self, expires: f64) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Set the secure flag.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the HTTP-only flag.
    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Whether the record's expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_epoch_seconds())
    }

    fn is_expired_at(&self, now: f64) -> bool {
        self.expires.is_some_and(|expires| now > expires)
    }

    /// Whether this cookie applies to `host`: equal, or host is a
    /// dot-suffix of the cookie domain.
    pub fn matches_domain(&self, host: &str) -> bool {
        if self.domain.is_empty() {
            return true;
        }
        let cookie_domain = self.domain.trim_start_matches('.');
        let host = host.trim_start_matches('.');
        host == cookie_domain || host.ends_with(&format!(".{cookie_domain}"))
    }

    /// Whether this cookie applies to `path` by prefix match.
    pub fn matches_path(&self, path: &str) -> bool {
        if self.path == "/" {
            return true;
        }
        path.starts_with(&self.path)
    }

    fn key(&self) -> CookieKey {
        CookieKey {
            domain: normalize_domain(&self.domain),
            path: self.path.clone(),
            name: self.name.clone(),
        }
    }

    /// Convert to the CDP cookie-install shape.
    pub fn to_cdp_param(&self) -> kestrel_cdp::protocol::network::CookieParam {
        use kestrel_cdp::protocol::network::CookieSameSite;

        let mut param = kestrel_cdp::protocol::network::CookieParam::new(&self.name, &self.value);
        if !self.domain.is_empty() {
            param.domain = Some(self.domain.clone());
        }
        param.path = Some(self.path.clone());
        param.secure = Some(self.secure);
        param.http_only = Some(self.http_only);
        param.expires = self.expires;
        param.same_site = Some(match self.same_site {
            SameSite::Strict => CookieSameSite::Strict,
            SameSite::Lax => CookieSameSite::Lax,
            SameSite::None => CookieSameSite::None,
        });
        param.priority = Some(
            match self.priority {
                CookiePriority::Low => "Low",
                CookiePriority::Medium => "Medium",
                CookiePriority::High => "High",
            }
            .to_string(),
        );
        param
    }
}

impl From<kestrel_cdp::protocol::network::Cookie> for CookieRecord {
    fn from(cookie: kestrel_cdp::protocol::network::Cookie) -> Self {
        use kestrel_cdp::protocol::network::CookieSameSite;

        Self {
            name: cookie.name,
            value: cookie.value,
            domain: cookie.domain,
            path: cookie.path,
            // Negative expiry is CDP's encoding of a session cookie.
            expires: (cookie.expires > 0.0).then_some(cookie.expires),
            http_only: cookie.http_only,
            secure: cookie.secure,
            same_site: match cookie.same_site {
                Some(CookieSameSite::Strict) => SameSite::Strict,
                Some(CookieSameSite::None) => SameSite::None,
                Some(CookieSameSite::Lax) | None => SameSite::Lax,
            },
            priority: match cookie.priority.as_deref() {
                Some("Low") => CookiePriority::Low,
                Some("High") => CookiePriority::High,
                _ => CookiePriority::Medium,
            },
        }
    }
}

/// Unique identity of a record inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CookieKey {
    domain: String,
    path: String,
    name: String,
}

fn normalize_domain(domain: &str) -> String {
    domain.trim_start_matches('.').to_ascii_lowercase()
}

fn now_epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Domain-aware cookie store.
///
/// Cheap to share: all operations take `&self` and lock only for short,
/// non-suspending critical sections.
#[derive(Debug, Default)]
pub struct CookieStore {
    records: parking_lot::RwLock<HashMap<CookieKey, CookieRecord>>,
}

impl CookieStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record by `(domain, path, name)`.
    ///
    /// Already-expired records are discarded immediately.
    pub fn set(&self, record: CookieRecord) {
        if record.is_expired() {
            debug!(name = %record.name, domain = %record.domain, "Discarding expired cookie on set");
            self.records.write().remove(&record.key());
            return;
        }
        self.records.write().insert(record.key(), record);
    }

    /// Bulk upsert.
    pub fn update_from_list(&self, records: impl IntoIterator<Item = CookieRecord>) {
        for record in records {
            self.set(record);
        }
    }

    /// Remove one record. Unset `domain`/`path` match any.
    pub fn delete(&self, name: &str, domain: Option<&str>, path: Option<&str>) {
        let domain = domain.map(normalize_domain);
        self.records.write().retain(|key, _| {
            !(key.name == name
                && domain.as_deref().is_none_or(|d| key.domain == d)
                && path.is_none_or(|p| key.path == p))
        });
    }

    /// Exact lookup; prunes and returns `None` when the record expired.
    pub fn get(&self, name: &str, domain: Option<&str>, path: Option<&str>) -> Option<CookieRecord> {
        self.prune_expired();
        let domain = domain.map(normalize_domain);
        let records = self.records.read();
        records
            .values()
            .find(|record| {
                record.name == name
                    && domain
                        .as_deref()
                        .is_none_or(|d| normalize_domain(&record.domain) == d)
                    && path.is_none_or(|p| record.path == p)
            })
            .cloned()
    }

    /// All cookies applicable to `url`.
    ///
    /// A cookie applies iff its domain matches the URL host, its path is
    /// a prefix of the URL path, and — when `secure` — the scheme is
    /// HTTPS.
    pub fn get_for_url(&self, url: &str) -> Vec<CookieRecord> {
        self.prune_expired();
        let Ok(parsed) = Url::parse(url) else {
            return Vec::new();
        };
        let host = parsed.host_str().unwrap_or_default();
        let path = parsed.path();
        let is_https = parsed.scheme() == "https";

        let records = self.records.read();
        let mut matches: Vec<CookieRecord> = records
            .values()
            .filter(|record| {
                record.matches_domain(host)
                    && record.matches_path(path)
                    && (!record.secure || is_https)
            })
            .cloned()
            .collect();
        // Longest path first, the order they belong in a Cookie header.
        matches.sort_by(|a, b| b.path.len().cmp(&a.path.len()).then(a.name.cmp(&b.name)));
        matches
    }

    /// All cookies whose domain matches `domain`.
    pub fn get_for_domain(&self, domain: &str) -> Vec<CookieRecord> {
        self.prune_expired();
        let records = self.records.read();
        records
            .values()
            .filter(|record| record.matches_domain(domain))
            .cloned()
            .collect()
    }

    /// Snapshot of every live record.
    pub fn get_all(&self) -> Vec<CookieRecord> {
        self.prune_expired();
        self.records.read().values().cloned().collect()
    }

    /// Remove all records, or only those of one domain.
    pub fn clear(&self, domain: Option<&str>) {
        match domain {
            None => self.records.write().clear(),
            Some(domain) => {
                let domain = normalize_domain(domain);
                self.records
                    .write()
                    .retain(|key, _| key.domain != domain);
            }
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.prune_expired();
        self.records.read().len()
    }

    /// Whether the store holds no live records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune_expired(&self) {
        let now = now_epoch_seconds();
        let mut records = self.records.write();
        records.retain(|_, record| !record.is_expired_at(now));
    }
}

#[cfg(test)]
mod tests;
