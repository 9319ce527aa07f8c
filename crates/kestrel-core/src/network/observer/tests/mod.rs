//! Observer state-machine tests driven by synthetic CDP events.

use std::collections::HashMap;

use kestrel_cdp::protocol::network::Request as WireRequest;

use super::*;
use crate::network::filter::FilterCriteria;

fn state() -> ObserverState {
    ObserverState::new(ObserverConfig::default())
}

fn state_with(config: ObserverConfig) -> ObserverState {
    ObserverState::new(config)
}

fn wire_request(url: &str, method: &str) -> WireRequest {
    WireRequest {
        url: url.to_string(),
        method: method.to_string(),
        headers: HashMap::new(),
        post_data: None,
        has_post_data: None,
    }
}

fn request_event(id: &str, url: &str, kind: &str, mono: f64) -> RequestWillBeSentEvent {
    RequestWillBeSentEvent {
        request_id: id.to_string(),
        loader_id: None,
        document_url: None,
        request: wire_request(url, "GET"),
        timestamp: mono,
        wall_time: 1_700_000_000.0 + mono,
        initiator: None,
        redirect_response: None,
        resource_type: Some(kind.to_string()),
        frame_id: Some("F1".to_string()),
    }
}

fn response_event(id: &str, url: &str, status: i64) -> ResponseReceivedEvent {
    ResponseReceivedEvent {
        request_id: id.to_string(),
        timestamp: 0.0,
        resource_type: None,
        response: kestrel_cdp::protocol::network::Response {
            url: url.to_string(),
            status,
            status_text: "OK".to_string(),
            headers: HashMap::new(),
            mime_type: "text/html".to_string(),
            remote_ip_address: None,
            remote_port: None,
            from_disk_cache: Some(false),
            from_service_worker: Some(false),
            timing: None,
            security_details: None,
        },
        frame_id: None,
    }
}

fn finished_event(id: &str, mono: f64) -> LoadingFinishedEvent {
    LoadingFinishedEvent {
        request_id: id.to_string(),
        timestamp: mono,
        encoded_data_length: 1024.0,
    }
}

fn failed_event(id: &str, error: &str) -> LoadingFailedEvent {
    LoadingFailedEvent {
        request_id: id.to_string(),
        timestamp: 1.0,
        error_text: error.to_string(),
        canceled: None,
    }
}

#[test]
fn request_creates_in_flight_entry() {
    let state = state();
    state.apply_request_will_be_sent(&request_event("R1", "https://example.com/", "Document", 1.0));

    let entries = state.snapshot();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].is_complete());
    assert_eq!(entries[0].request.resource_kind, ResourceKind::Document);
}

#[test]
fn request_stage_rejection_is_never_stored() {
    let state = state();
    *state.filter.lock() = Some(NetworkFilter::url("*api*"));

    state.apply_request_will_be_sent(&request_event("R1", "https://x/home", "Document", 1.0));
    state.apply_request_will_be_sent(&request_event("R2", "https://x/api/v1", "Fetch", 2.0));

    let entries = state.snapshot();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].request.request_id, "R2");
}

#[test]
fn response_stage_rejection_deletes_entry() {
    let state = state();
    *state.filter.lock() =
        Some(NetworkFilter::new().criteria(FilterCriteria::new().status_range(200, 299)));

    state.apply_request_will_be_sent(&request_event("R1", "https://x/a", "Fetch", 1.0));
    state.apply_request_will_be_sent(&request_event("R2", "https://x/b", "Fetch", 2.0));
    state.apply_response_received(&response_event("R1", "https://x/a", 404));
    state.apply_response_received(&response_event("R2", "https://x/b", 200));

    let entries = state.snapshot();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].request.request_id, "R2");
    assert_eq!(entries[0].response.as_ref().unwrap().status, 200);
}

#[test]
fn finished_completes_with_monotonic_duration() {
    let state = state();
    state.apply_request_will_be_sent(&request_event("R1", "https://x/", "Document", 10.0));
    state.apply_response_received(&response_event("R1", "https://x/", 200));
    let completed = state.apply_loading_finished(&finished_event("R1", 10.5)).unwrap();

    assert!(completed.is_complete());
    assert!(completed.started_at <= completed.finished_at.unwrap());
    assert!((completed.duration_ms().unwrap() - 500.0).abs() < 1e-6);
}

#[test]
fn failed_is_terminal_with_error() {
    let state = state();
    state.apply_request_will_be_sent(&request_event("R1", "https://x/", "Fetch", 0.5));
    let completed = state
        .apply_loading_failed(&failed_event("R1", "net::ERR_CONNECTION_REFUSED"))
        .unwrap();

    assert!(completed.is_complete());
    assert!(completed.is_failed());
    assert_eq!(completed.error.as_deref(), Some("net::ERR_CONNECTION_REFUSED"));
}

#[test]
fn eviction_is_fifo_by_insertion() {
    let state = state_with(ObserverConfig {
        max_entries: 2,
        ..ObserverConfig::default()
    });
    state.apply_request_will_be_sent(&request_event("R1", "https://x/1", "Fetch", 1.0));
    state.apply_request_will_be_sent(&request_event("R2", "https://x/2", "Fetch", 2.0));
    state.apply_request_will_be_sent(&request_event("R3", "https://x/3", "Fetch", 3.0));

    let ids: Vec<String> = state
        .snapshot()
        .into_iter()
        .map(|e| e.request.request_id)
        .collect();
    assert_eq!(ids, vec!["R2".to_string(), "R3".to_string()]);
}

#[test]
fn extra_info_merges_headers_both_stages() {
    let state = state();
    state.apply_request_will_be_sent(&request_event("R1", "https://x/", "Fetch", 1.0));
    state.apply_request_extra_info(&RequestWillBeSentExtraInfoEvent {
        request_id: "R1".to_string(),
        headers: HashMap::from([("cookie".to_string(), "a=1".to_string())]),
    });
    state.apply_response_received(&response_event("R1", "https://x/", 200));
    state.apply_response_extra_info(&ResponseReceivedExtraInfoEvent {
        request_id: "R1".to_string(),
        headers: HashMap::from([("set-cookie".to_string(), "b=2".to_string())]),
    });

    let entry = state.entry("R1").unwrap();
    assert_eq!(entry.request.headers.get("cookie").unwrap(), "a=1");
    assert_eq!(
        entry.response.unwrap().headers.get("set-cookie").unwrap(),
        "b=2"
    );
}

#[tokio::test]
async fn wait_for_request_resolves_synchronously_on_existing_match() {
    let state = state();
    state.apply_request_will_be_sent(&request_event("R1", "https://x/api/users", "Fetch", 1.0));

    // Zero-ish deadline: an existing match must still resolve.
    let request = state
        .wait_for_request("*api*", None, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(request.request_id, "R1");
}

#[tokio::test]
async fn wait_for_request_times_out_with_zero_deadline_and_no_match() {
    let state = state();
    let result = state.wait_for_request("*api*", None, Duration::ZERO).await;
    assert!(matches!(result, Err(NetworkError::Timeout(_))));
}

#[tokio::test]
async fn wait_for_response_sees_future_response() {
    let state = Arc::new(state());
    let waiter_state = state.clone();
    let waiter = tokio::spawn(async move {
        waiter_state
            .wait_for_response("*status/200", None, Duration::from_secs(2))
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    state.apply_request_will_be_sent(&request_event(
        "R1",
        "https://httpbin.org/status/200",
        "Fetch",
        1.0,
    ));
    state.apply_response_received(&response_event("R1", "https://httpbin.org/status/200", 200));

    let response = waiter.await.unwrap().unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn wait_for_entry_fires_only_on_completion() {
    let state = Arc::new(state());
    let waiter_state = state.clone();
    let waiter = tokio::spawn(async move {
        waiter_state
            .wait_for_entry("*x*", None, Duration::from_secs(2))
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    state.apply_request_will_be_sent(&request_event("R1", "https://x/", "Fetch", 1.0));
    state.apply_response_received(&response_event("R1", "https://x/", 200));
    // Not finished yet; give the waiter a chance to (incorrectly) fire.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    state.apply_loading_finished(&finished_event("R1", 1.5));
    let entry = waiter.await.unwrap().unwrap();
    assert!(entry.is_complete());
}

#[tokio::test]
async fn wait_for_entry_id_eviction_is_opt_in() {
    let state = Arc::new(state_with(ObserverConfig {
        max_entries: 1,
        ..ObserverConfig::default()
    }));
    state.apply_request_will_be_sent(&request_event("R1", "https://x/1", "Fetch", 1.0));

    let opted_in = {
        let state = state.clone();
        tokio::spawn(async move {
            state
                .wait_for_entry_id("R1", Duration::from_secs(2), true)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Pushing a second request evicts R1 from the single-slot ring.
    state.apply_request_will_be_sent(&request_event("R2", "https://x/2", "Fetch", 2.0));

    let result = opted_in.await.unwrap();
    assert!(matches!(result, Err(NetworkError::EntryEvicted(id)) if id == "R1"));

    // Without opt-in the waiter just runs into its deadline.
    let result = state
        .wait_for_entry_id("R2", Duration::from_millis(100), false)
        .await;
    assert!(matches!(result, Err(NetworkError::Timeout(_))));
}

#[tokio::test]
async fn idle_resolves_after_quiet_window() {
    let state = state();
    state.apply_request_will_be_sent(&request_event("R1", "https://x/", "Fetch", 1.0));
    state.apply_loading_finished(&finished_event("R1", 1.1));

    state
        .wait_for_idle(Duration::from_millis(100), Duration::from_secs(2))
        .await
        .unwrap();
}

#[tokio::test]
async fn idle_times_out_under_steady_completions() {
    let state = Arc::new(state());
    let feeder_state = state.clone();
    let feeder = tokio::spawn(async move {
        for i in 0..20 {
            let id = format!("R{i}");
            feeder_state.apply_request_will_be_sent(&request_event(&id, "https://x/", "Fetch", 1.0));
            feeder_state.apply_loading_finished(&finished_event(&id, 1.1));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let result = state
        .wait_for_idle(Duration::from_millis(300), Duration::from_millis(500))
        .await;
    assert!(matches!(result, Err(NetworkError::Timeout(_))));
    feeder.abort();
}

#[tokio::test]
async fn stream_preserves_finish_order_across_ids() {
    let state = state();
    let (tx, rx) = mpsc::channel(16);
    state.streams.lock().push(tx);
    let mut stream = NetworkStream { rx, filter: None };

    state.apply_request_will_be_sent(&request_event("R1", "https://x/slow", "Fetch", 1.0));
    state.apply_request_will_be_sent(&request_event("R2", "https://x/fast", "Fetch", 1.0));
    // R2 finishes before R1 even though it was requested later.
    state.apply_loading_finished(&finished_event("R2", 1.2));
    state.apply_loading_finished(&finished_event("R1", 1.9));

    assert_eq!(stream.next().await.unwrap().request.request_id, "R2");
    assert_eq!(stream.next().await.unwrap().request.request_id, "R1");
}

#[tokio::test]
async fn stream_filter_skips_non_matching() {
    let state = state();
    let (tx, rx) = mpsc::channel(16);
    state.streams.lock().push(tx);
    let mut stream = NetworkStream {
        rx,
        filter: Some(NetworkFilter::url("*api*")),
    };

    state.apply_request_will_be_sent(&request_event("R1", "https://x/home", "Fetch", 1.0));
    state.apply_request_will_be_sent(&request_event("R2", "https://x/api/v1", "Fetch", 1.0));
    state.apply_loading_finished(&finished_event("R1", 1.1));
    state.apply_loading_finished(&finished_event("R2", 1.2));

    assert_eq!(stream.next().await.unwrap().request.request_id, "R2");
}

#[test]
fn full_stream_queue_drops_newest_without_blocking() {
    let state = state();
    let (tx, mut rx) = mpsc::channel(1);
    state.streams.lock().push(tx);

    state.apply_request_will_be_sent(&request_event("R1", "https://x/1", "Fetch", 1.0));
    state.apply_request_will_be_sent(&request_event("R2", "https://x/2", "Fetch", 1.0));
    state.apply_loading_finished(&finished_event("R1", 1.1));
    // Queue of one is full; this completion is dropped, not blocked on.
    state.apply_loading_finished(&finished_event("R2", 1.2));

    assert_eq!(rx.try_recv().unwrap().request.request_id, "R1");
    assert!(rx.try_recv().is_err());
    // The sender stays registered for future entries.
    assert_eq!(state.streams.lock().len(), 1);
}

#[test]
fn stats_aggregate_ring_contents() {
    let state = state();
    state.apply_request_will_be_sent(&request_event("R1", "https://x/1", "Document", 1.0));
    state.apply_response_received(&response_event("R1", "https://x/1", 200));
    state.apply_loading_finished(&finished_event("R1", 1.2));

    state.apply_request_will_be_sent(&request_event("R2", "https://x/2", "Fetch", 2.0));
    state.apply_loading_failed(&failed_event("R2", "net::ERR_FAILED"));

    state.apply_request_will_be_sent(&request_event("R3", "https://x/3", "Fetch", 3.0));

    let stats = state.stats();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.complete_entries, 2);
    assert_eq!(stats.pending_entries, 1);
    assert_eq!(stats.error_entries, 1);
    assert_eq!(stats.status_codes.get(&200), Some(&1));
    assert_eq!(stats.resource_kinds.get(&ResourceKind::Fetch), Some(&2));
}

#[test]
fn clear_empties_the_ring() {
    let state = state();
    state.apply_request_will_be_sent(&request_event("R1", "https://x/", "Fetch", 1.0));
    state.clear();
    assert!(state.snapshot().is_empty());
}

#[test]
fn body_cache_roundtrip() {
    let state = state();
    state.apply_request_will_be_sent(&request_event("R1", "https://x/", "Fetch", 1.0));
    assert!(state.cached_body("R1").is_none());
    state.cache_body("R1", Bytes::from_static(b"payload"));
    assert_eq!(state.cached_body("R1").unwrap().as_ref(), b"payload");
}
