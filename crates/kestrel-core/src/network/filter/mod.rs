//! Request/response filtering.
//!
//! A [`NetworkFilter`] is a list of [`FilterCriteria`] composed with
//! match-all (AND) or match-any (OR), behind two outer layers evaluated
//! first: a URL blacklist that always excludes, and a URL whitelist that,
//! when non-empty, requires at least one match.

use std::sync::Arc;

use url::Url;

use super::types::{glob_match, HttpMethod, NetworkRequest, NetworkResponse, ResourceKind};

/// Predicate over a request, usable as a criterion.
pub type RequestPredicate = Arc<dyn Fn(&NetworkRequest) -> bool + Send + Sync>;
/// Predicate over a response, usable as a criterion.
pub type ResponsePredicate = Arc<dyn Fn(&NetworkResponse) -> bool + Send + Sync>;

/// One bundle of criteria; every set field must hold for the bundle to
/// match. Unset fields are skipped. Request-only fields (method,
/// resource kind) are ignored when matching responses, and vice versa.
#[derive(Clone, Default)]
pub struct FilterCriteria {
    /// Exact URL.
    pub url: Option<String>,
    /// URL glob pattern.
    pub url_pattern: Option<String>,
    /// URL regex.
    pub url_regex: Option<regex::Regex>,
    /// URL substring.
    pub url_contains: Option<String>,
    /// URL prefix.
    pub url_prefix: Option<String>,
    /// URL suffix.
    pub url_suffix: Option<String>,
    /// Exact host.
    pub domain: Option<String>,
    /// Host glob pattern.
    pub domain_pattern: Option<String>,
    /// Allowed methods; empty means any.
    pub methods: Vec<HttpMethod>,
    /// Allowed resource kinds; empty means any.
    pub resource_kinds: Vec<ResourceKind>,
    /// Excluded resource kinds.
    pub exclude_resource_kinds: Vec<ResourceKind>,
    /// Required header name.
    pub has_header: Option<String>,
    /// Required (header, exact value) pair.
    pub header_value: Option<(String, String)>,
    /// Required (header, value regex) pair.
    pub header_pattern: Option<(String, regex::Regex)>,
    /// Exact status.
    pub status: Option<u16>,
    /// Inclusive status range.
    pub status_range: Option<(u16, u16)>,
    /// Allowed status codes; empty means any.
    pub status_codes: Vec<u16>,
    /// Content-type substrings; any match passes.
    pub content_types: Vec<String>,
    /// Require from-cache to equal this.
    pub from_cache: Option<bool>,
    /// Require from-service-worker to equal this.
    pub from_service_worker: Option<bool>,
    /// Arbitrary request predicate.
    pub request_predicate: Option<RequestPredicate>,
    /// Arbitrary response predicate.
    pub response_predicate: Option<ResponsePredicate>,
}

impl std::fmt::Debug for FilterCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCriteria")
            .field("url", &self.url)
            .field("url_pattern", &self.url_pattern)
            .field("domain", &self.domain)
            .field("methods", &self.methods)
            .field("resource_kinds", &self.resource_kinds)
            .field("status", &self.status)
            .field("status_range", &self.status_range)
            .finish_non_exhaustive()
    }
}

impl FilterCriteria {
    /// Empty criteria; matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an exact URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Require a URL glob match.
    #[must_use]
    pub fn url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.url_pattern = Some(pattern.into());
        self
    }

    /// Require a URL regex match.
    #[must_use]
    pub fn url_regex(mut self, regex: regex::Regex) -> Self {
        self.url_regex = Some(regex);
        self
    }

    /// Require a URL substring.
    #[must_use]
    pub fn url_contains(mut self, needle: impl Into<String>) -> Self {
        self.url_contains = Some(needle.into());
        self
    }

    /// Require a URL prefix.
    #[must_use]
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(prefix.into());
        self
    }

    /// Require a URL suffix.
    #[must_use]
    pub fn url_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.url_suffix = Some(suffix.into());
        self
    }

    /// Require an exact host.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Require a host glob match.
    #[must_use]
    pub fn domain_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.domain_pattern = Some(pattern.into());
        self
    }

    /// Allow only these methods.
    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        self.methods.extend(methods);
        self
    }

    /// Allow only these resource kinds.
    #[must_use]
    pub fn resource_kinds(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.resource_kinds.extend(kinds);
        self
    }

    /// Exclude these resource kinds.
    #[must_use]
    pub fn exclude_resource_kinds(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.exclude_resource_kinds.extend(kinds);
        self
    }

    /// Require a header to be present.
    #[must_use]
    pub fn has_header(mut self, name: impl Into<String>) -> Self {
        self.has_header = Some(name.into());
        self
    }

    /// Require a header to equal a value.
    #[must_use]
    pub fn header_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_value = Some((name.into(), value.into()));
        self
    }

    /// Require a header value to match a regex.
    #[must_use]
    pub fn header_pattern(mut self, name: impl Into<String>, pattern: regex::Regex) -> Self {
        self.header_pattern = Some((name.into(), pattern));
        self
    }

    /// Require an exact status.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Require a status inside an inclusive range.
    #[must_use]
    pub fn status_range(mut self, min: u16, max: u16) -> Self {
        self.status_range = Some((min, max));
        self
    }

    /// Require a content-type containing any of these substrings.
    #[must_use]
    pub fn content_types(mut self, types: impl IntoIterator<Item = String>) -> Self {
        self.content_types.extend(types);
        self
    }

    /// Require the cache flag to equal `from_cache`.
    #[must_use]
    pub fn from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = Some(from_cache);
        self
    }

    /// Require the service-worker flag to equal `from_sw`.
    #[must_use]
    pub fn from_service_worker(mut self, from_sw: bool) -> Self {
        self.from_service_worker = Some(from_sw);
        self
    }

    /// Attach an arbitrary request predicate.
    #[must_use]
    pub fn request_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&NetworkRequest) -> bool + Send + Sync + 'static,
    {
        self.request_predicate = Some(Arc::new(predicate));
        self
    }

    /// Attach an arbitrary response predicate.
    #[must_use]
    pub fn response_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&NetworkResponse) -> bool + Send + Sync + 'static,
    {
        self.response_predicate = Some(Arc::new(predicate));
        self
    }

    fn matches_url(&self, url: &str) -> bool {
        if self.url.as_deref().is_some_and(|u| u != url) {
            return false;
        }
        if self
            .url_pattern
            .as_deref()
            .is_some_and(|p| !glob_match(p, url))
        {
            return false;
        }
        if self.url_regex.as_ref().is_some_and(|re| !re.is_match(url)) {
            return false;
        }
        if self
            .url_contains
            .as_deref()
            .is_some_and(|n| !url.contains(n))
        {
            return false;
        }
        if self
            .url_prefix
            .as_deref()
            .is_some_and(|p| !url.starts_with(p))
        {
            return false;
        }
        if self
            .url_suffix
            .as_deref()
            .is_some_and(|s| !url.ends_with(s))
        {
            return false;
        }

        if self.domain.is_some() || self.domain_pattern.is_some() {
            let host = extract_host(url);
            if self.domain.as_deref().is_some_and(|d| host != d) {
                return false;
            }
            if self
                .domain_pattern
                .as_deref()
                .is_some_and(|p| !glob_match(p, &host))
            {
                return false;
            }
        }

        true
    }

    fn matches_headers(&self, headers: &std::collections::HashMap<String, String>) -> bool {
        let lookup = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        };

        if self
            .has_header
            .as_deref()
            .is_some_and(|name| lookup(name).is_none())
        {
            return false;
        }
        if let Some((name, value)) = &self.header_value {
            if lookup(name) != Some(value.as_str()) {
                return false;
            }
        }
        if let Some((name, pattern)) = &self.header_pattern {
            let value = lookup(name).unwrap_or_default();
            if !pattern.is_match(value) {
                return false;
            }
        }
        true
    }

    /// Request-stage evaluation.
    pub fn matches_request(&self, request: &NetworkRequest) -> bool {
        if !self.matches_url(&request.url) {
            return false;
        }

        if !self.methods.is_empty()
            && !self
                .methods
                .iter()
                .any(|m| m.as_str().eq_ignore_ascii_case(&request.method))
        {
            return false;
        }

        if !self.resource_kinds.is_empty() && !self.resource_kinds.contains(&request.resource_kind)
        {
            return false;
        }
        if self.exclude_resource_kinds.contains(&request.resource_kind) {
            return false;
        }

        if !self.matches_headers(&request.headers) {
            return false;
        }

        if let Some(predicate) = &self.request_predicate {
            if !predicate(request) {
                return false;
            }
        }

        true
    }

    /// Response-stage evaluation.
    pub fn matches_response(&self, response: &NetworkResponse) -> bool {
        if !self.matches_url(&response.url) {
            return false;
        }

        if self.status.is_some_and(|s| s != response.status) {
            return false;
        }
        if self
            .status_range
            .is_some_and(|(min, max)| !(min..=max).contains(&response.status))
        {
            return false;
        }
        if !self.status_codes.is_empty() && !self.status_codes.contains(&response.status) {
            return false;
        }

        if !self.content_types.is_empty() {
            let content_type = response.content_type();
            if !self.content_types.iter().any(|ct| content_type.contains(ct)) {
                return false;
            }
        }

        if self.from_cache.is_some_and(|f| f != response.from_cache) {
            return false;
        }
        if self
            .from_service_worker
            .is_some_and(|f| f != response.from_service_worker)
        {
            return false;
        }

        if !self.matches_headers(&response.headers) {
            return false;
        }

        if let Some(predicate) = &self.response_predicate {
            if !predicate(response) {
                return false;
            }
        }

        true
    }
}

fn extract_host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Composable request/response filter.
#[derive(Debug, Clone, Default)]
pub struct NetworkFilter {
    criteria: Vec<FilterCriteria>,
    match_all: bool,
    url_blacklist: Vec<String>,
    url_whitelist: Vec<String>,
}

impl NetworkFilter {
    /// A match-all (AND) filter with no criteria; matches everything.
    pub fn new() -> Self {
        Self {
            criteria: Vec::new(),
            match_all: true,
            url_blacklist: Vec::new(),
            url_whitelist: Vec::new(),
        }
    }

    /// A match-any (OR) filter with no criteria.
    pub fn match_any() -> Self {
        Self {
            match_all: false,
            ..Self::new()
        }
    }

    /// Add one criteria bundle.
    #[must_use]
    pub fn criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria.push(criteria);
        self
    }

    /// Add glob patterns that always exclude.
    #[must_use]
    pub fn blacklist(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.url_blacklist.extend(patterns);
        self
    }

    /// Add glob patterns that, once any exist, a URL must match one of.
    #[must_use]
    pub fn whitelist(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.url_whitelist.extend(patterns);
        self
    }

    /// Drop all criteria and lists.
    pub fn clear(&mut self) {
        self.criteria.clear();
        self.url_blacklist.clear();
        self.url_whitelist.clear();
    }

    fn passes_lists(&self, url: &str) -> bool {
        if self
            .url_blacklist
            .iter()
            .any(|pattern| glob_match(pattern, url))
        {
            return false;
        }
        if !self.url_whitelist.is_empty() {
            return self
                .url_whitelist
                .iter()
                .any(|pattern| glob_match(pattern, url));
        }
        true
    }

    fn combine(&self, results: impl Iterator<Item = bool>) -> bool {
        let mut results = results.peekable();
        if results.peek().is_none() {
            return true;
        }
        if self.match_all {
            results.all(|r| r)
        } else {
            results.any(|r| r)
        }
    }

    /// Whether a request passes the lists and criteria.
    pub fn matches_request(&self, request: &NetworkRequest) -> bool {
        if !self.passes_lists(&request.url) {
            return false;
        }
        self.combine(self.criteria.iter().map(|c| c.matches_request(request)))
    }

    /// Whether a response passes the lists and criteria.
    pub fn matches_response(&self, response: &NetworkResponse) -> bool {
        if !self.passes_lists(&response.url) {
            return false;
        }
        self.combine(self.criteria.iter().map(|c| c.matches_response(response)))
    }

    /// Keep only matching requests.
    pub fn filter_requests(&self, requests: Vec<NetworkRequest>) -> Vec<NetworkRequest> {
        requests
            .into_iter()
            .filter(|r| self.matches_request(r))
            .collect()
    }

    /// Keep only matching responses.
    pub fn filter_responses(&self, responses: Vec<NetworkResponse>) -> Vec<NetworkResponse> {
        responses
            .into_iter()
            .filter(|r| self.matches_response(r))
            .collect()
    }

    // Factory shorthands for the common shapes.

    /// Filter by URL glob.
    pub fn url(pattern: impl Into<String>) -> Self {
        Self::new().criteria(FilterCriteria::new().url_pattern(pattern))
    }

    /// Filter by allowed methods.
    pub fn method(methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        Self::new().criteria(FilterCriteria::new().methods(methods))
    }

    /// Filter by allowed resource kinds.
    pub fn resource_kind(kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        Self::new().criteria(FilterCriteria::new().resource_kinds(kinds))
    }

    /// API traffic: XHR and Fetch, optionally under a URL glob.
    pub fn api(base_url: Option<&str>) -> Self {
        let mut criteria =
            FilterCriteria::new().resource_kinds([ResourceKind::Xhr, ResourceKind::Fetch]);
        if let Some(base_url) = base_url {
            criteria = criteria.url_pattern(base_url);
        }
        Self::new().criteria(criteria)
    }

    /// Document requests only.
    pub fn document() -> Self {
        Self::resource_kind([ResourceKind::Document])
    }

    /// Media assets: images, audio/video, fonts.
    pub fn media() -> Self {
        Self::resource_kind([ResourceKind::Image, ResourceKind::Media, ResourceKind::Font])
    }

    /// Script requests only.
    pub fn script() -> Self {
        Self::resource_kind([ResourceKind::Script])
    }

    /// Filter by exact status.
    pub fn status(status: u16) -> Self {
        Self::new().criteria(FilterCriteria::new().status(status))
    }

    /// Error responses: 4xx or 5xx.
    pub fn errors() -> Self {
        Self::match_any()
            .criteria(FilterCriteria::new().status_range(400, 499))
            .criteria(FilterCriteria::new().status_range(500, 599))
    }

    /// Successful responses: 2xx.
    pub fn success() -> Self {
        Self::new().criteria(FilterCriteria::new().status_range(200, 299))
    }
}

#[cfg(test)]
mod tests;
