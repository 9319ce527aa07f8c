use super::*;

fn info(target_id: &str, kind: &str, context: Option<&str>) -> TargetInfo {
    TargetInfo {
        target_id: target_id.to_string(),
        target_type: kind.to_string(),
        title: String::new(),
        url: "about:blank".to_string(),
        attached: false,
        browser_context_id: context.map(str::to_string),
        opener_id: None,
    }
}

#[test]
fn default_context_matches_contextless_targets() {
    assert!(target_matches_context(None, &info("T1", "page", None)));
    // The wire sometimes sends the empty string for the default context.
    assert!(target_matches_context(None, &info("T1", "page", Some(""))));
    assert!(!target_matches_context(None, &info("T1", "page", Some("CTX"))));
}

#[test]
fn named_context_requires_exact_match() {
    assert!(target_matches_context(
        Some("CTX"),
        &info("T1", "page", Some("CTX"))
    ));
    assert!(!target_matches_context(
        Some("CTX"),
        &info("T1", "page", Some("OTHER"))
    ));
    assert!(!target_matches_context(Some("CTX"), &info("T1", "page", None)));
    assert!(!target_matches_context(
        Some("CTX"),
        &info("T1", "page", Some(""))
    ));
}
