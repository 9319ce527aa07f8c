use std::time::Duration;

use super::*;

#[test]
fn connection_failed_display() {
    let err = CdpError::ConnectionFailed("connection refused".to_string());
    assert_eq!(
        err.to_string(),
        "WebSocket connection failed: connection refused"
    );
}

#[test]
fn connection_lost_display() {
    assert_eq!(
        CdpError::ConnectionLost.to_string(),
        "WebSocket connection lost"
    );
}

#[test]
fn protocol_error_display() {
    let err = CdpError::Protocol {
        code: -32601,
        message: "Method not found".to_string(),
    };
    assert_eq!(err.to_string(), "CDP protocol error -32601: Method not found");
}

#[test]
fn timeout_display_seconds_and_millis() {
    assert_eq!(
        CdpError::Timeout(Duration::from_secs(30)).to_string(),
        "response timeout after 30s"
    );
    assert_eq!(
        CdpError::Timeout(Duration::from_millis(500)).to_string(),
        "response timeout after 500ms"
    );
}

#[test]
fn json_error_converts() {
    let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
    let err: CdpError = json_err.into();
    assert!(err.to_string().starts_with("JSON error:"));
}

#[test]
fn tungstenite_closed_maps_to_connection_lost() {
    let err: CdpError = tokio_tungstenite::tungstenite::Error::ConnectionClosed.into();
    assert!(matches!(err, CdpError::ConnectionLost));

    let err: CdpError = tokio_tungstenite::tungstenite::Error::AlreadyClosed.into();
    assert!(matches!(err, CdpError::ConnectionLost));
}

#[test]
fn session_not_found_display() {
    let err = CdpError::SessionNotFound("AB12".to_string());
    assert_eq!(err.to_string(), "session not found: AB12");
}

#[test]
fn error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CdpError>();
}
