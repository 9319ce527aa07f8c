use super::*;

fn config() -> HybridConfig {
    HybridConfig::default()
}

#[test]
fn forced_modes_win() {
    let mut cfg = config();
    cfg.mode = HybridMode::Browser;
    assert!(should_use_browser(&cfg, "https://x/api/data.json", Operation::Navigate));
    assert!(should_use_browser(&cfg, "https://x/api/data.json", Operation::Fetch));

    cfg.mode = HybridMode::Session;
    assert!(!should_use_browser(&cfg, "https://x/app", Operation::Navigate));
    assert!(!should_use_browser(&cfg, "https://x/app", Operation::Content));
}

#[test]
fn interactive_operations_always_take_the_browser() {
    let mut cfg = config();
    for operation in [Operation::Interact, Operation::Evaluate, Operation::Instrument] {
        assert!(should_use_browser(&cfg, "https://x/api/data", operation));
    }
    // Even under forced session mode.
    cfg.mode = HybridMode::Session;
    assert!(should_use_browser(&cfg, "https://x/api/data", Operation::Interact));
}

#[test]
fn fetch_always_takes_the_session() {
    let cfg = config();
    assert!(!should_use_browser(&cfg, "https://x/page", Operation::Fetch));
}

#[test]
fn browser_required_patterns_override_session_preference() {
    let mut cfg = config();
    cfg.browser_required_patterns.push("challenge".to_string());
    assert!(should_use_browser(
        &cfg,
        "https://x/challenge/api/data.json",
        Operation::Navigate
    ));
}

#[test]
fn session_preferred_patterns_pick_http() {
    let cfg = config();
    for url in [
        "https://x/api/users",
        "https://x/data.json",
        "https://x/feed.xml",
        "https://x/graphql",
    ] {
        assert!(!should_use_browser(&cfg, url, Operation::Navigate), "url: {url}");
    }
}

#[test]
fn navigation_bias_follows_prefer_session() {
    let mut cfg = config();
    cfg.prefer_session = true;
    assert!(!should_use_browser(&cfg, "https://x/app", Operation::Navigate));

    cfg.prefer_session = false;
    assert!(should_use_browser(&cfg, "https://x/app", Operation::Navigate));
    // With the browser bias, session-preferred patterns stop applying.
    assert!(should_use_browser(&cfg, "https://x/api/users", Operation::Navigate));
}

#[test]
fn non_navigation_defaults_to_browser() {
    let cfg = config();
    assert!(should_use_browser(&cfg, "https://x/app", Operation::Content));
    assert!(should_use_browser(&cfg, "https://x/app", Operation::Query));
}

#[test]
fn default_config_carries_api_shapes() {
    let cfg = config();
    assert!(cfg.session_preferred_patterns.contains(&"/api/".to_string()));
    assert!(cfg.session_preferred_patterns.contains(&"/graphql".to_string()));
    assert!(cfg.auto_sync_cookies);
    assert_eq!(cfg.mode, HybridMode::Auto);
}
