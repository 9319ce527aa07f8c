use serde_json::json;

use super::*;

#[test]
fn target_info_parses_wire_shape() {
    let raw = json!({
        "targetId": "T1",
        "type": "page",
        "title": "Example",
        "url": "https://example.com/",
        "attached": false,
        "browserContextId": "CTX1",
        "openerId": "T0"
    });
    let info: TargetInfo = serde_json::from_value(raw).unwrap();
    assert_eq!(info.target_id, "T1");
    assert_eq!(info.target_type, "page");
    assert_eq!(info.browser_context_id.as_deref(), Some("CTX1"));
    assert_eq!(info.opener_id.as_deref(), Some("T0"));
}

#[test]
fn create_target_params_serialize_camel_case() {
    let params = CreateTargetParams::new("about:blank").browser_context_id("CTX9");
    let json = serde_json::to_value(&params).unwrap();
    assert_eq!(json["url"], "about:blank");
    assert_eq!(json["browserContextId"], "CTX9");
    assert!(json.get("newWindow").is_none());
}

#[test]
fn auto_attach_params_flatten_on_wire() {
    let params = SetAutoAttachParams {
        auto_attach: true,
        wait_for_debugger_on_start: false,
        flatten: Some(true),
    };
    let json = serde_json::to_value(&params).unwrap();
    assert_eq!(json["autoAttach"], true);
    assert_eq!(json["waitForDebuggerOnStart"], false);
    assert_eq!(json["flatten"], true);
}

#[test]
fn crashed_event_parses() {
    let raw = json!({"targetId": "T3", "status": "crashed", "errorCode": 139});
    let event: TargetCrashedEvent = serde_json::from_value(raw).unwrap();
    assert_eq!(event.target_id, "T3");
    assert_eq!(event.error_code, 139);
}
