//! Session router tests against an in-process WebSocket server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use super::*;

/// A server that answers `Target.attachToTarget` with a fixed session id,
/// acks everything else, and pushes the given events after the first
/// attach.
async fn spawn_target_server(push_after_attach: Vec<Value>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut write, mut read) = ws.split();

        while let Some(Ok(Message::Text(text))) = read.next().await {
            let frame: Value = serde_json::from_str(&text).unwrap();
            let id = frame["id"].clone();
            let method = frame["method"].as_str().unwrap_or_default();

            let reply = if method == "Target.attachToTarget" {
                json!({"id": id, "result": {"sessionId": "SESSION-A"}})
            } else {
                json!({"id": id, "result": {}})
            };
            let _ = write.send(Message::Text(reply.to_string().into())).await;

            if method == "Target.attachToTarget" {
                for event in &push_after_attach {
                    let _ = write.send(Message::Text(event.to_string().into())).await;
                }
            }
        }
    });

    format!("ws://{addr}")
}

#[tokio::test]
async fn attach_returns_session_handle() {
    let url = spawn_target_server(vec![]).await;
    let conn = Arc::new(CdpConnection::connect(&url).await.unwrap());
    let router = SessionRouter::new(conn);

    let session = router.attach("TARGET-1").await.unwrap();
    assert_eq!(session.session_id(), "SESSION-A");
    assert_eq!(session.target_id(), "TARGET-1");
    assert!(!session.is_detached());
    assert_eq!(router.target_of("SESSION-A").as_deref(), Some("TARGET-1"));
}

#[tokio::test]
async fn handlers_fire_in_registration_order() {
    let url = spawn_target_server(vec![json!({
        "method": "Page.loadEventFired",
        "params": {"timestamp": 1.0},
        "sessionId": "SESSION-A"
    })])
    .await;
    let conn = Arc::new(CdpConnection::connect(&url).await.unwrap());
    let router = SessionRouter::new(conn);

    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let (a, b) = (order.clone(), order.clone());
    router.on("SESSION-A", "Page.loadEventFired", move |_| a.lock().push("first"));
    router.on("SESSION-A", "Page.loadEventFired", move |_| b.lock().push("second"));

    let _session = router.attach("TARGET-1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(*order.lock(), vec!["first", "second"]);
}

#[tokio::test]
async fn off_removes_only_the_named_handler() {
    let url = spawn_target_server(vec![json!({
        "method": "Page.loadEventFired",
        "params": {},
        "sessionId": "SESSION-A"
    })])
    .await;
    let conn = Arc::new(CdpConnection::connect(&url).await.unwrap());
    let router = SessionRouter::new(conn);

    let kept = Arc::new(AtomicUsize::new(0));
    let removed = Arc::new(AtomicUsize::new(0));
    let kept_in = kept.clone();
    let removed_in = removed.clone();

    router.on("SESSION-A", "Page.loadEventFired", move |_| {
        kept_in.fetch_add(1, Ordering::SeqCst);
    });
    let to_remove = router.on("SESSION-A", "Page.loadEventFired", move |_| {
        removed_in.fetch_add(1, Ordering::SeqCst);
    });
    router.off("SESSION-A", "Page.loadEventFired", to_remove);

    let _session = router.attach("TARGET-1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(kept.load(Ordering::SeqCst), 1);
    assert_eq!(removed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn panicking_handler_does_not_stop_delivery() {
    let url = spawn_target_server(vec![json!({
        "method": "Page.loadEventFired",
        "params": {},
        "sessionId": "SESSION-A"
    })])
    .await;
    let conn = Arc::new(CdpConnection::connect(&url).await.unwrap());
    let router = SessionRouter::new(conn);

    let reached = Arc::new(AtomicUsize::new(0));
    let reached_in = reached.clone();
    router.on("SESSION-A", "Page.loadEventFired", |_| panic!("boom"));
    router.on("SESSION-A", "Page.loadEventFired", move |_| {
        reached_in.fetch_add(1, Ordering::SeqCst);
    });

    let _session = router.attach("TARGET-1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(reached.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn events_for_other_sessions_are_not_delivered() {
    let url = spawn_target_server(vec![json!({
        "method": "Page.loadEventFired",
        "params": {},
        "sessionId": "SESSION-B"
    })])
    .await;
    let conn = Arc::new(CdpConnection::connect(&url).await.unwrap());
    let router = SessionRouter::new(conn);

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_in = fired.clone();
    router.on("SESSION-A", "Page.loadEventFired", move |_| {
        fired_in.fetch_add(1, Ordering::SeqCst);
    });

    let _session = router.attach("TARGET-1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn detach_makes_session_terminal() {
    let url = spawn_target_server(vec![]).await;
    let conn = Arc::new(CdpConnection::connect(&url).await.unwrap());
    let router = SessionRouter::new(conn);

    let session = router.attach("TARGET-1").await.unwrap();
    router.detach("SESSION-A").await.unwrap();

    assert!(session.is_detached());
    assert!(router.target_of("SESSION-A").is_none());

    let result: Result<Value, CdpError> = session.send_command("Page.enable", None::<Value>).await;
    assert!(matches!(result, Err(CdpError::SessionNotFound(_))));
}
