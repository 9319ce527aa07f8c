//! Connection tests against an in-process WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use super::*;

/// Spawn a WebSocket server that feeds every inbound frame to `handler`
/// and writes back whatever frames the handler returns.
async fn spawn_server<F>(handler: F) -> String
where
    F: Fn(Value) -> Vec<Value> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut write, mut read) = ws.split();

        while let Some(Ok(Message::Text(text))) = read.next().await {
            let frame: Value = serde_json::from_str(&text).unwrap();
            for reply in handler(frame.clone()) {
                let _ = write
                    .send(Message::Text(reply.to_string().into()))
                    .await;
            }
        }
    });

    format!("ws://{addr}")
}

#[tokio::test]
async fn send_command_resolves_with_result() {
    let url = spawn_server(|frame| {
        vec![json!({"id": frame["id"], "result": {"targetId": "T1"}})]
    })
    .await;

    let conn = CdpConnection::connect(&url).await.unwrap();
    let result: Value = conn
        .send_command("Target.createTarget", Some(json!({"url": "about:blank"})), None)
        .await
        .unwrap();
    assert_eq!(result["targetId"], "T1");
}

#[tokio::test]
async fn protocol_error_surfaces_to_waiter() {
    let url = spawn_server(|frame| {
        vec![json!({"id": frame["id"], "error": {"code": -32000, "message": "No target with given id"}})]
    })
    .await;

    let conn = CdpConnection::connect(&url).await.unwrap();
    let result: Result<Value, CdpError> = conn
        .send_command("Target.attachToTarget", Some(json!({"targetId": "nope"})), None)
        .await;

    match result {
        Err(CdpError::Protocol { code, message }) => {
            assert_eq!(code, -32000);
            assert!(message.contains("No target"));
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn events_fan_out_to_subscribers() {
    let url = spawn_server(|frame| {
        vec![
            json!({"method": "Target.targetCreated", "params": {"targetInfo": {"targetId": "T9"}}, "sessionId": "S1"}),
            json!({"id": frame["id"], "result": {}}),
        ]
    })
    .await;

    let conn = CdpConnection::connect(&url).await.unwrap();
    let mut events = conn.subscribe_events();

    let _: Value = conn
        .send_command("Target.setDiscoverTargets", Some(json!({"discover": true})), None)
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.method, "Target.targetCreated");
    assert_eq!(event.session_id.as_deref(), Some("S1"));
}

#[tokio::test]
async fn replies_fulfill_in_browser_order() {
    // The server answers the second request first; each waiter still gets
    // its own payload because slots are keyed by id.
    let url = spawn_server(|frame| {
        let id = frame["id"].as_u64().unwrap();
        if id == 1 {
            vec![]
        } else {
            vec![
                json!({"id": 2, "result": {"seq": 2}}),
                json!({"id": 1, "result": {"seq": 1}}),
            ]
        }
    })
    .await;

    let conn = CdpConnection::connect(&url).await.unwrap();
    let first = conn.send_command::<Value, Value>("A.first", None, None);
    let second = conn.send_command::<Value, Value>("A.second", None, None);
    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap()["seq"], 1);
    assert_eq!(second.unwrap()["seq"], 2);
}

#[tokio::test]
async fn timeout_removes_slot_and_late_reply_is_dropped() {
    let url = spawn_server(|_frame| vec![]).await;

    let conn = CdpConnection::connect(&url).await.unwrap();
    let result: Result<Value, CdpError> = conn
        .send_command_with_timeout("A.slow", None::<Value>, None, Duration::from_millis(50))
        .await;
    assert!(matches!(result, Err(CdpError::Timeout(_))));
}

#[tokio::test]
async fn send_on_closed_connection_fails_immediately() {
    let url = spawn_server(|frame| vec![json!({"id": frame["id"], "result": {}})]).await;

    let conn = CdpConnection::connect(&url).await.unwrap();
    conn.close();
    assert!(conn.is_closed());

    let started = std::time::Instant::now();
    let result: Result<Value, CdpError> = conn.send_command("A.any", None::<Value>, None).await;
    assert!(matches!(result, Err(CdpError::ConnectionLost)));
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn server_disconnect_cascades_to_pending_waiters() {
    // Server that drops the socket as soon as a frame arrives.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (_write, mut read) = ws.split();
        let _ = read.next().await;
        // Both halves drop here, closing the connection.
    });

    let conn = CdpConnection::connect(&format!("ws://{addr}")).await.unwrap();
    let pending_a = conn.send_command::<Value, Value>("A.one", None, None);
    let pending_b = conn.send_command::<Value, Value>("A.two", None, None);
    let (a, b) = tokio::join!(pending_a, pending_b);
    assert!(matches!(a, Err(CdpError::ConnectionLost)));
    assert!(matches!(b, Err(CdpError::ConnectionLost)));

    // Later sends short-circuit with the same kind.
    let later: Result<Value, CdpError> = conn.send_command("A.three", None::<Value>, None).await;
    assert!(matches!(later, Err(CdpError::ConnectionLost)));
}

#[tokio::test]
async fn malformed_frames_are_dropped_not_terminal() {
    let url = spawn_server(|frame| {
        vec![
            json!("this is not an object"),
            json!({"id": frame["id"], "result": {"ok": true}}),
        ]
    })
    .await;

    let conn = CdpConnection::connect(&url).await.unwrap();
    let result: Value = conn.send_command("A.any", None::<Value>, None).await.unwrap();
    assert_eq!(result["ok"], true);
}
