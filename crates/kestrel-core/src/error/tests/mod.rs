use super::*;

#[test]
fn classify_navigation_errors() {
    assert_eq!(
        NavigationError::classify("net::ERR_NAME_NOT_RESOLVED"),
        NavigationFailure::Dns
    );
    assert_eq!(
        NavigationError::classify("net::ERR_CERT_AUTHORITY_INVALID"),
        NavigationFailure::Ssl
    );
    assert_eq!(
        NavigationError::classify("net::ERR_SSL_PROTOCOL_ERROR"),
        NavigationFailure::Ssl
    );
    assert_eq!(
        NavigationError::classify("net::ERR_ABORTED"),
        NavigationFailure::Aborted
    );
    assert_eq!(
        NavigationError::classify("net::ERR_CONNECTION_REFUSED"),
        NavigationFailure::Net
    );
    assert_eq!(
        NavigationError::classify("net::ERR_INTERNET_DISCONNECTED"),
        NavigationFailure::Net
    );
    assert_eq!(
        NavigationError::classify("something else entirely"),
        NavigationFailure::Other
    );
}

#[test]
fn navigation_failed_display_carries_url_and_text() {
    let err = NavigationError::from_error_text("https://nope.invalid/", "net::ERR_NAME_NOT_RESOLVED");
    let text = err.to_string();
    assert!(text.contains("https://nope.invalid/"));
    assert!(text.contains("ERR_NAME_NOT_RESOLVED"));
    assert!(text.contains("Dns"));
}

#[test]
fn cdp_errors_flow_into_core_error() {
    let err: CoreError = CdpError::ConnectionLost.into();
    assert_eq!(err.to_string(), "CDP error: WebSocket connection lost");

    let err: CoreError = PageError::Crashed.into();
    assert_eq!(err.to_string(), "page error: page crashed");
}

#[test]
fn pool_error_display() {
    assert_eq!(PoolError::Closed.to_string(), "pool is closed");
    assert!(PoolError::Timeout(std::time::Duration::from_secs(5))
        .to_string()
        .contains("5s"));
}

#[test]
fn profile_locked_display() {
    let err = ProfileError::Locked { pid: 4242 };
    assert_eq!(err.to_string(), "profile locked by pid 4242");
}

#[test]
fn errors_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CoreError>();
    assert_send_sync::<NetworkError>();
    assert_send_sync::<HybridError>();
}
