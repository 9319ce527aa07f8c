use std::collections::HashMap;

use super::*;

fn request(url: &str, method: &str, kind: ResourceKind) -> NetworkRequest {
    NetworkRequest {
        request_id: "R".to_string(),
        url: url.to_string(),
        method: method.to_string(),
        headers: HashMap::new(),
        post_data: None,
        resource_kind: kind,
        timestamp: 0.0,
    }
}

fn response(url: &str, status: u16, mime: &str) -> NetworkResponse {
    NetworkResponse {
        request_id: "R".to_string(),
        url: url.to_string(),
        status,
        status_text: String::new(),
        headers: HashMap::new(),
        mime_type: mime.to_string(),
        remote_ip: None,
        remote_port: None,
        from_cache: false,
        from_service_worker: false,
        timestamp: 0.0,
    }
}

#[test]
fn empty_filter_matches_everything() {
    let filter = NetworkFilter::new();
    assert!(filter.matches_request(&request(
        "https://example.com/",
        "GET",
        ResourceKind::Document
    )));
    assert!(filter.matches_response(&response("https://example.com/", 500, "text/html")));
}

#[test]
fn url_pattern_criteria() {
    let filter = NetworkFilter::url("*api*");
    assert!(filter.matches_request(&request(
        "https://example.com/api/users",
        "GET",
        ResourceKind::Fetch
    )));
    assert!(!filter.matches_request(&request(
        "https://example.com/home",
        "GET",
        ResourceKind::Fetch
    )));
}

#[test]
fn method_and_kind_are_request_stage_only() {
    let filter = NetworkFilter::new().criteria(
        FilterCriteria::new()
            .methods([HttpMethod::Post])
            .resource_kinds([ResourceKind::Xhr]),
    );

    assert!(filter.matches_request(&request("https://x/", "POST", ResourceKind::Xhr)));
    assert!(!filter.matches_request(&request("https://x/", "GET", ResourceKind::Xhr)));
    assert!(!filter.matches_request(&request("https://x/", "POST", ResourceKind::Image)));

    // Responses carry no method/kind; those criteria are skipped.
    assert!(filter.matches_response(&response("https://x/", 200, "application/json")));
}

#[test]
fn excluded_resource_kinds_reject() {
    let filter = NetworkFilter::new()
        .criteria(FilterCriteria::new().exclude_resource_kinds([ResourceKind::Image]));
    assert!(!filter.matches_request(&request("https://x/a.png", "GET", ResourceKind::Image)));
    assert!(filter.matches_request(&request("https://x/a", "GET", ResourceKind::Document)));
}

#[test]
fn domain_matching_uses_host() {
    let filter = NetworkFilter::new().criteria(FilterCriteria::new().domain("api.example.com"));
    assert!(filter.matches_request(&request(
        "https://api.example.com/v1",
        "GET",
        ResourceKind::Fetch
    )));
    assert!(!filter.matches_request(&request(
        "https://www.example.com/v1",
        "GET",
        ResourceKind::Fetch
    )));

    let filter = NetworkFilter::new()
        .criteria(FilterCriteria::new().domain_pattern("*.example.com"));
    assert!(filter.matches_request(&request(
        "https://cdn.example.com/a.js",
        "GET",
        ResourceKind::Script
    )));
}

#[test]
fn header_criteria() {
    let mut req = request("https://x/", "GET", ResourceKind::Fetch);
    req.headers
        .insert("Authorization".to_string(), "Bearer abc".to_string());

    let present = NetworkFilter::new().criteria(FilterCriteria::new().has_header("authorization"));
    assert!(present.matches_request(&req));

    let exact = NetworkFilter::new()
        .criteria(FilterCriteria::new().header_value("Authorization", "Bearer abc"));
    assert!(exact.matches_request(&req));

    let pattern = NetworkFilter::new().criteria(
        FilterCriteria::new().header_pattern("Authorization", regex::Regex::new("^Bearer ").unwrap()),
    );
    assert!(pattern.matches_request(&req));

    let wrong = NetworkFilter::new()
        .criteria(FilterCriteria::new().header_value("Authorization", "Bearer xyz"));
    assert!(!wrong.matches_request(&req));
}

#[test]
fn status_criteria_are_response_stage() {
    let filter = NetworkFilter::status(404);
    assert!(filter.matches_response(&response("https://x/", 404, "text/html")));
    assert!(!filter.matches_response(&response("https://x/", 200, "text/html")));

    let range = NetworkFilter::new().criteria(FilterCriteria::new().status_range(200, 299));
    assert!(range.matches_response(&response("https://x/", 204, "")));
    assert!(!range.matches_response(&response("https://x/", 301, "")));
}

#[test]
fn content_type_substring_any_of() {
    let filter = NetworkFilter::new().criteria(
        FilterCriteria::new().content_types(vec!["json".to_string(), "xml".to_string()]),
    );
    assert!(filter.matches_response(&response("https://x/", 200, "application/json")));
    assert!(filter.matches_response(&response("https://x/", 200, "text/xml")));
    assert!(!filter.matches_response(&response("https://x/", 200, "text/html")));
}

#[test]
fn match_any_combinator() {
    let filter = NetworkFilter::errors();
    assert!(filter.matches_response(&response("https://x/", 404, "")));
    assert!(filter.matches_response(&response("https://x/", 503, "")));
    assert!(!filter.matches_response(&response("https://x/", 200, "")));
}

#[test]
fn match_all_combinator_requires_every_bundle() {
    let filter = NetworkFilter::new()
        .criteria(FilterCriteria::new().url_contains("api"))
        .criteria(FilterCriteria::new().url_contains("v2"));
    assert!(filter.matches_request(&request("https://x/api/v2/a", "GET", ResourceKind::Fetch)));
    assert!(!filter.matches_request(&request("https://x/api/v1/a", "GET", ResourceKind::Fetch)));
}

#[test]
fn blacklist_always_excludes() {
    let filter = NetworkFilter::url("*api*").blacklist(vec!["*tracking*".to_string()]);
    assert!(!filter.matches_request(&request(
        "https://x/api/tracking/ping",
        "GET",
        ResourceKind::Fetch
    )));
    assert!(filter.matches_request(&request("https://x/api/users", "GET", ResourceKind::Fetch)));
}

#[test]
fn whitelist_requires_a_match_when_set() {
    let filter = NetworkFilter::new().whitelist(vec!["*example.com*".to_string()]);
    assert!(filter.matches_request(&request("https://example.com/x", "GET", ResourceKind::Fetch)));
    assert!(!filter.matches_request(&request("https://other.org/x", "GET", ResourceKind::Fetch)));
}

#[test]
fn blacklist_wins_over_whitelist() {
    let filter = NetworkFilter::new()
        .whitelist(vec!["*example.com*".to_string()])
        .blacklist(vec!["*example.com/private*".to_string()]);
    assert!(!filter.matches_request(&request(
        "https://example.com/private/x",
        "GET",
        ResourceKind::Fetch
    )));
}

#[test]
fn custom_predicates() {
    let filter = NetworkFilter::new().criteria(
        FilterCriteria::new().request_predicate(|r| r.post_data.is_some()),
    );
    let mut req = request("https://x/", "POST", ResourceKind::Fetch);
    assert!(!filter.matches_request(&req));
    req.post_data = Some("payload".to_string());
    assert!(filter.matches_request(&req));
}

#[test]
fn api_factory_combines_kind_and_url() {
    let filter = NetworkFilter::api(Some("*example*"));
    assert!(filter.matches_request(&request(
        "https://example.com/data",
        "GET",
        ResourceKind::Fetch
    )));
    assert!(!filter.matches_request(&request(
        "https://example.com/data",
        "GET",
        ResourceKind::Image
    )));
    assert!(!filter.matches_request(&request(
        "https://other.org/data",
        "GET",
        ResourceKind::Xhr
    )));
}

#[test]
fn filter_lists_in_bulk() {
    let filter = NetworkFilter::media();
    let requests = vec![
        request("https://x/a.png", "GET", ResourceKind::Image),
        request("https://x/a.js", "GET", ResourceKind::Script),
        request("https://x/a.woff", "GET", ResourceKind::Font),
    ];
    let kept = filter.filter_requests(requests);
    assert_eq!(kept.len(), 2);
}
