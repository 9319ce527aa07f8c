use serde_json::json;

use super::*;

#[test]
fn get_version_result_parses() {
    let raw = json!({
        "protocolVersion": "1.3",
        "product": "Chrome/130.0.6723.58",
        "revision": "@abcdef",
        "userAgent": "Mozilla/5.0 (X11; Linux x86_64)",
        "jsVersion": "13.0.245.14"
    });
    let version: GetVersionResult = serde_json::from_value(raw).unwrap();
    assert_eq!(version.product, "Chrome/130.0.6723.58");
    assert!(version.user_agent.starts_with("Mozilla/5.0"));
}

#[test]
fn grant_permissions_scopes_to_context() {
    let params = GrantPermissionsParams {
        permissions: vec!["geolocation".to_string()],
        origin: None,
        browser_context_id: Some("CTX1".to_string()),
    };
    let json = serde_json::to_value(&params).unwrap();
    assert_eq!(json["permissions"][0], "geolocation");
    assert_eq!(json["browserContextId"], "CTX1");
    assert!(json.get("origin").is_none());
}

#[test]
fn bounds_roundtrip_partial() {
    let bounds = Bounds {
        width: Some(1280),
        height: Some(720),
        ..Bounds::default()
    };
    let json = serde_json::to_value(&bounds).unwrap();
    assert_eq!(json, json!({"width": 1280, "height": 720}));
}
