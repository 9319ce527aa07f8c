use serde_json::json;
use tokio::sync::broadcast;

use super::*;

fn event(method: &str, session: &str, params: serde_json::Value) -> CdpEvent {
    CdpEvent {
        method: method.to_string(),
        params: Some(params),
        session_id: Some(session.to_string()),
    }
}

#[test]
fn load_states_are_ordered() {
    assert!(LoadState::Commit < LoadState::DomContentLoaded);
    assert!(LoadState::DomContentLoaded < LoadState::Load);
    assert!(LoadState::Load < LoadState::NetworkIdle);

    assert!(LoadState::DomContentLoaded.is_reached(LoadState::Load));
    assert!(!LoadState::Load.is_reached(LoadState::DomContentLoaded));
}

#[test]
fn load_state_parses_wait_until_names() {
    assert_eq!(LoadState::parse("load"), Some(LoadState::Load));
    assert_eq!(
        LoadState::parse("domcontentloaded"),
        Some(LoadState::DomContentLoaded)
    );
    assert_eq!(LoadState::parse("networkidle"), Some(LoadState::NetworkIdle));
    assert_eq!(LoadState::parse("bogus"), None);
}

#[tokio::test]
async fn wait_resolves_on_load_event() {
    let (tx, rx) = broadcast::channel(64);
    let mut waiter = LifecycleWaiter::new(rx, "S1", "F1");

    let feeder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(event("Page.domContentEventFired", "S1", json!({})));
        let _ = tx.send(event("Page.loadEventFired", "S1", json!({})));
        // Keep the sender alive long enough for the waiter.
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    waiter
        .wait_for_with_timeout(LoadState::Load, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(waiter.current(), LoadState::Load);
    feeder.abort();
}

#[tokio::test]
async fn events_from_other_sessions_are_ignored() {
    let (tx, rx) = broadcast::channel(64);
    let mut waiter = LifecycleWaiter::new(rx, "S1", "F1");

    let feeder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = tx.send(event("Page.loadEventFired", "OTHER", json!({})));
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let result = waiter
        .wait_for_with_timeout(LoadState::Load, Duration::from_millis(200))
        .await;
    assert!(matches!(result, Err(WaitError::Timeout(_))));
    feeder.abort();
}

#[tokio::test]
async fn already_reached_state_returns_immediately() {
    let (tx, rx) = broadcast::channel(64);
    let mut waiter = LifecycleWaiter::new(rx, "S1", "F1");
    waiter.advance(LoadState::Load);

    // No events will arrive; an already-satisfied target must not wait.
    waiter
        .wait_for_with_timeout(LoadState::DomContentLoaded, Duration::from_millis(100))
        .await
        .unwrap();
    drop(tx);
}

#[tokio::test]
async fn closed_event_stream_reports_page_closed() {
    let (tx, rx) = broadcast::channel(64);
    let mut waiter = LifecycleWaiter::new(rx, "S1", "F1");
    drop(tx);

    let result = waiter
        .wait_for_with_timeout(LoadState::Load, Duration::from_secs(1))
        .await;
    assert!(matches!(result, Err(WaitError::PageClosed)));
}

#[tokio::test]
async fn network_idle_waits_for_quiet_window() {
    let (tx, rx) = broadcast::channel(64);
    let mut waiter = LifecycleWaiter::new(rx, "S1", "F1");

    let feeder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = tx.send(event("Page.loadEventFired", "S1", json!({})));
        tokio::time::sleep(Duration::from_millis(800)).await;
    });

    let started = std::time::Instant::now();
    waiter
        .wait_for_with_timeout(LoadState::NetworkIdle, Duration::from_secs(3))
        .await
        .unwrap();
    // The idle window itself must have elapsed.
    assert!(started.elapsed() >= Duration::from_millis(400));
    feeder.abort();
}
