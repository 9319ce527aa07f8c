use std::collections::HashMap;

use super::*;

fn request(url: &str) -> NetworkRequest {
    NetworkRequest {
        request_id: "R1".to_string(),
        url: url.to_string(),
        method: "GET".to_string(),
        headers: HashMap::new(),
        post_data: None,
        resource_kind: ResourceKind::Fetch,
        timestamp: 1000.0,
    }
}

#[test]
fn resource_kind_parses_cdp_strings() {
    assert_eq!(ResourceKind::parse("Document"), ResourceKind::Document);
    assert_eq!(ResourceKind::parse("XHR"), ResourceKind::Xhr);
    assert_eq!(ResourceKind::parse("Fetch"), ResourceKind::Fetch);
    assert_eq!(ResourceKind::parse("nonsense"), ResourceKind::Other);
}

#[test]
fn header_lookup_is_case_insensitive() {
    let mut req = request("http://example.com/");
    req.headers
        .insert("Content-Type".to_string(), "text/html".to_string());
    assert_eq!(req.header("content-type"), Some("text/html"));
    assert_eq!(req.header("CONTENT-TYPE"), Some("text/html"));
    assert_eq!(req.header("x-missing"), None);
}

#[test]
fn entry_duration_and_completion() {
    let mut entry = NetworkEntry {
        request: request("http://example.com/"),
        response: None,
        body: None,
        error: None,
        timing: None,
        started_at: 1000.0,
        finished_at: None,
    };
    assert!(!entry.is_complete());
    assert!(entry.duration_ms().is_none());

    entry.finished_at = Some(1000.25);
    assert!(entry.is_complete());
    assert!((entry.duration_ms().unwrap() - 250.0).abs() < 1e-6);
}

#[test]
fn response_ok_covers_2xx_only() {
    let mut resp = NetworkResponse {
        request_id: "R1".to_string(),
        url: "http://example.com/".to_string(),
        status: 204,
        status_text: "No Content".to_string(),
        headers: HashMap::new(),
        mime_type: "text/plain".to_string(),
        remote_ip: None,
        remote_port: None,
        from_cache: false,
        from_service_worker: false,
        timestamp: 0.0,
    };
    assert!(resp.ok());
    resp.status = 301;
    assert!(!resp.ok());
    resp.status = 404;
    assert!(!resp.ok());
}

#[test]
fn glob_star_crosses_slashes() {
    assert!(glob_match("http://example.com/*.png", "http://example.com/a.png"));
    assert!(glob_match(
        "http://example.com/*.png",
        "http://example.com/images/a.png"
    ));
    assert!(!glob_match("http://example.com/*.png", "http://example.org/a.png"));
}

#[test]
fn glob_double_star_is_equivalent() {
    assert!(glob_match("**/api/**", "https://example.com/api/v1/users"));
    assert!(glob_match("**/*.css", "https://cdn.example.com/styles/site.css"));
    assert!(!glob_match("**/api/**", "https://example.com/home"));
}

#[test]
fn glob_substring_pattern() {
    assert!(glob_match("*httpbin*/status/200", "https://httpbin.org/status/200"));
    assert!(!glob_match("*httpbin*/status/200", "https://httpbin.org/status/404"));
}

#[test]
fn glob_question_mark_is_literal() {
    assert!(glob_match("**/search?q=rust", "https://example.com/search?q=rust"));
    assert!(!glob_match("**/search?q=rust", "https://example.com/searchXq=rust"));
}
