//! Per-session network observation.
//!
//! One observer watches the Network domain of one attached session. It
//! keeps an insertion-ordered bounded ring of entries keyed by request
//! id, evaluates the effective filter in two stages (request seen /
//! status arrived), feeds one-shot waiters, bounded streams, and idle
//! detection, and fetches response bodies on demand or eagerly.
//!
//! Event-order guarantees: per request id, request → response →
//! finished|failed, as delivered by the protocol; an entry is published
//! as complete only on finished or failed, and streams preserve finish
//! order across request ids. The dispatch path never blocks: stream
//! overflow drops the newest entry with a warning.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use bytes::Bytes;
use kestrel_cdp::protocol::network::{
    DataReceivedEvent, EnableParams, GetResponseBodyParams, GetResponseBodyResult,
    LoadingFailedEvent, LoadingFinishedEvent, RequestWillBeSentEvent,
    RequestWillBeSentExtraInfoEvent, ResponseReceivedEvent, ResponseReceivedExtraInfoEvent,
};
use kestrel_cdp::CdpSession;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, instrument, trace, warn};

use super::filter::NetworkFilter;
use super::types::{glob_match, NetworkEntry, NetworkRequest, NetworkResponse, ResourceKind, StreamingChunk};
use crate::error::NetworkError;
use kestrel_cdp::CdpError;

/// Observer configuration.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Ring capacity; the oldest insertion is evicted beyond this.
    pub max_entries: usize,
    /// Fetch and cache response bodies as exchanges finish.
    pub capture_body: bool,
    /// Keep the CDP timing block on entries.
    pub capture_timing: bool,
    /// Longest POST body the browser buffers, bytes.
    pub max_post_data_size: u64,
    /// Per-resource browser buffer, bytes.
    pub max_resource_buffer_size: u64,
    /// Total browser buffer, bytes.
    pub max_total_buffer_size: u64,
    /// Bound of each stream queue, entries.
    pub stream_queue_size: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            capture_body: false,
            capture_timing: true,
            max_post_data_size: 64 * 1024,
            max_resource_buffer_size: 100 * 1024 * 1024,
            max_total_buffer_size: 200 * 1024 * 1024,
            stream_queue_size: 1000,
        }
    }
}

/// Traffic statistics over the current ring.
#[derive(Debug, Clone, Default)]
pub struct ObserverStats {
    /// Entries currently held.
    pub total_entries: usize,
    /// Entries in a terminal state.
    pub complete_entries: usize,
    /// In-flight entries.
    pub pending_entries: usize,
    /// Failed entries.
    pub error_entries: usize,
    /// Mean duration of complete entries, milliseconds.
    pub average_duration_ms: f64,
    /// Completed responses per status code.
    pub status_codes: HashMap<u16, usize>,
    /// Requests per resource kind.
    pub resource_kinds: HashMap<ResourceKind, usize>,
}

/// Internal fan-out events.
#[derive(Debug, Clone)]
enum ObserverEvent {
    Request(NetworkRequest),
    Response(NetworkResponse),
    /// Terminal entry, finished or failed.
    Entry(NetworkEntry),
    Failed {
        request_id: String,
        error: String,
    },
    Chunk(StreamingChunk),
    Evicted(String),
    /// The underlying transport is gone; waiters resolve with
    /// `ConnectionLost`.
    TransportLost,
}

struct TrackedEntry {
    entry: NetworkEntry,
    /// Monotonic browser timestamp of the request, for duration math.
    mono_start: f64,
}

#[derive(Default)]
struct EntryRing {
    map: HashMap<String, TrackedEntry>,
    order: VecDeque<String>,
}

struct ObserverState {
    config: ObserverConfig,
    ring: parking_lot::Mutex<EntryRing>,
    filter: parking_lot::Mutex<Option<NetworkFilter>>,
    events: broadcast::Sender<ObserverEvent>,
    streams: parking_lot::Mutex<Vec<mpsc::Sender<NetworkEntry>>>,
    last_completion: parking_lot::Mutex<Instant>,
    transport_lost: std::sync::atomic::AtomicBool,
}

fn now_epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

impl ObserverState {
    fn new(config: ObserverConfig) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            config,
            ring: parking_lot::Mutex::new(EntryRing::default()),
            filter: parking_lot::Mutex::new(None),
            events,
            streams: parking_lot::Mutex::new(Vec::new()),
            last_completion: parking_lot::Mutex::new(Instant::now()),
            transport_lost: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn mark_transport_lost(&self) {
        self.transport_lost
            .store(true, std::sync::atomic::Ordering::SeqCst);
        self.emit(ObserverEvent::TransportLost);
        // Streams end too: their senders drop with the pump's state
        // references, so just close them explicitly.
        self.streams.lock().clear();
    }

    fn check_transport(&self) -> Result<(), NetworkError> {
        if self.transport_lost.load(std::sync::atomic::Ordering::SeqCst) {
            Err(NetworkError::Cdp(CdpError::ConnectionLost))
        } else {
            Ok(())
        }
    }

    fn emit(&self, event: ObserverEvent) {
        let _ = self.events.send(event);
    }

    /// `Network.requestWillBeSent`: request-stage filtering and entry
    /// creation. A request rejected here is never stored.
    fn apply_request_will_be_sent(&self, event: &RequestWillBeSentEvent) {
        let request = NetworkRequest {
            request_id: event.request_id.clone(),
            url: event.request.url.clone(),
            method: event.request.method.clone(),
            headers: event.request.headers.clone(),
            post_data: event.request.post_data.clone(),
            resource_kind: event
                .resource_type
                .as_deref()
                .map_or(ResourceKind::Other, ResourceKind::parse),
            timestamp: event.wall_time,
        };

        if let Some(filter) = self.filter.lock().as_ref() {
            if !filter.matches_request(&request) {
                trace!(request_id = %event.request_id, url = %request.url, "Request rejected by filter");
                return;
            }
        }

        let entry = NetworkEntry {
            request: request.clone(),
            response: None,
            body: None,
            error: None,
            timing: None,
            started_at: event.wall_time,
            finished_at: None,
        };

        {
            let mut ring = self.ring.lock();
            if !ring.map.contains_key(&event.request_id) {
                ring.order.push_back(event.request_id.clone());
            }
            ring.map.insert(
                event.request_id.clone(),
                TrackedEntry {
                    entry,
                    mono_start: event.timestamp,
                },
            );

            // FIFO eviction by insertion order.
            while ring.order.len() > self.config.max_entries {
                if let Some(old_id) = ring.order.pop_front() {
                    ring.map.remove(&old_id);
                    debug!(request_id = %old_id, "Evicted oldest network entry");
                    self.emit(ObserverEvent::Evicted(old_id));
                }
            }
        }

        self.emit(ObserverEvent::Request(request));
    }

    /// `Network.requestWillBeSentExtraInfo`: merge raw request headers.
    fn apply_request_extra_info(&self, event: &RequestWillBeSentExtraInfoEvent) {
        let mut ring = self.ring.lock();
        if let Some(tracked) = ring.map.get_mut(&event.request_id) {
            tracked
                .entry
                .request
                .headers
                .extend(event.headers.clone());
        }
    }

    /// `Network.responseReceived`: response-stage filtering. A response
    /// rejected here deletes the whole entry.
    fn apply_response_received(&self, event: &ResponseReceivedEvent) {
        let response = NetworkResponse {
            request_id: event.request_id.clone(),
            url: event.response.url.clone(),
            status: event.response.status as u16,
            status_text: event.response.status_text.clone(),
            headers: event.response.headers.clone(),
            mime_type: event.response.mime_type.clone(),
            remote_ip: event.response.remote_ip_address.clone(),
            remote_port: event.response.remote_port,
            from_cache: event.response.from_disk_cache.unwrap_or(false),
            from_service_worker: event.response.from_service_worker.unwrap_or(false),
            timestamp: now_epoch_seconds(),
        };

        let rejected = self
            .filter
            .lock()
            .as_ref()
            .is_some_and(|filter| !filter.matches_response(&response));

        let mut ring = self.ring.lock();
        if rejected {
            if ring.map.remove(&event.request_id).is_some() {
                ring.order.retain(|id| id != &event.request_id);
                trace!(request_id = %event.request_id, "Entry deleted by response-stage filter");
            }
            return;
        }

        let Some(tracked) = ring.map.get_mut(&event.request_id) else {
            return;
        };
        tracked.entry.response = Some(response.clone());
        if self.config.capture_timing {
            tracked.entry.timing = event.response.timing.clone();
        }
        drop(ring);

        self.emit(ObserverEvent::Response(response));
    }

    /// `Network.responseReceivedExtraInfo`: merge raw response headers.
    fn apply_response_extra_info(&self, event: &ResponseReceivedExtraInfoEvent) {
        let mut ring = self.ring.lock();
        if let Some(tracked) = ring.map.get_mut(&event.request_id) {
            if let Some(response) = tracked.entry.response.as_mut() {
                response.headers.extend(event.headers.clone());
            }
        }
    }

    /// `Network.loadingFinished`: the entry becomes terminal and is
    /// published to entry listeners and streams.
    fn apply_loading_finished(&self, event: &LoadingFinishedEvent) -> Option<NetworkEntry> {
        let complete = {
            let mut ring = self.ring.lock();
            let tracked = ring.map.get_mut(&event.request_id)?;
            let elapsed = (event.timestamp - tracked.mono_start).max(0.0);
            tracked.entry.finished_at = Some(tracked.entry.started_at + elapsed);
            tracked.entry.clone()
        };
        self.complete_entry(complete.clone());
        Some(complete)
    }

    /// `Network.loadingFailed`: terminal with an error.
    fn apply_loading_failed(&self, event: &LoadingFailedEvent) -> Option<NetworkEntry> {
        let complete = {
            let mut ring = self.ring.lock();
            let tracked = ring.map.get_mut(&event.request_id)?;
            let elapsed = (event.timestamp - tracked.mono_start).max(0.0);
            tracked.entry.error = Some(event.error_text.clone());
            tracked.entry.finished_at = Some(tracked.entry.started_at + elapsed);
            tracked.entry.clone()
        };
        self.emit(ObserverEvent::Failed {
            request_id: event.request_id.clone(),
            error: event.error_text.clone(),
        });
        self.complete_entry(complete.clone());
        Some(complete)
    }

    /// `Network.dataReceived`: streaming chunk notification.
    fn apply_data_received(&self, event: &DataReceivedEvent) {
        self.emit(ObserverEvent::Chunk(StreamingChunk {
            request_id: event.request_id.clone(),
            data_length: event.data_length,
            encoded_length: event.encoded_data_length,
            timestamp: event.timestamp,
        }));
    }

    /// Publish a terminal entry: idle clock, listeners, stream queues.
    fn complete_entry(&self, entry: NetworkEntry) {
        *self.last_completion.lock() = Instant::now();
        self.emit(ObserverEvent::Entry(entry.clone()));

        let mut streams = self.streams.lock();
        streams.retain(|tx| {
            match tx.try_send(entry.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Bounded queue: drop rather than block the reader.
                    warn!(request_id = %entry.request.request_id, "Stream queue full, dropping entry");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    fn cache_body(&self, request_id: &str, body: Bytes) {
        let mut ring = self.ring.lock();
        if let Some(tracked) = ring.map.get_mut(request_id) {
            tracked.entry.body = Some(body);
        }
    }

    fn cached_body(&self, request_id: &str) -> Option<Bytes> {
        self.ring
            .lock()
            .map
            .get(request_id)
            .and_then(|t| t.entry.body.clone())
    }

    fn snapshot(&self) -> Vec<NetworkEntry> {
        let ring = self.ring.lock();
        ring.order
            .iter()
            .filter_map(|id| ring.map.get(id).map(|t| t.entry.clone()))
            .collect()
    }

    fn entry(&self, request_id: &str) -> Option<NetworkEntry> {
        self.ring
            .lock()
            .map
            .get(request_id)
            .map(|t| t.entry.clone())
    }

    fn clear(&self) {
        let mut ring = self.ring.lock();
        ring.map.clear();
        ring.order.clear();
    }

    fn entry_matches(entry: &NetworkEntry, url_glob: &str, filter: Option<&NetworkFilter>) -> bool {
        if !glob_match(url_glob, &entry.request.url) {
            return false;
        }
        if let Some(filter) = filter {
            if !filter.matches_request(&entry.request) {
                return false;
            }
            if let Some(response) = &entry.response {
                if !filter.matches_response(response) {
                    return false;
                }
            }
        }
        true
    }

    async fn wait_for_request(
        &self,
        url_glob: &str,
        filter: Option<&NetworkFilter>,
        deadline: Duration,
    ) -> Result<NetworkRequest, NetworkError> {
        self.check_transport()?;
        let mut events = self.events.subscribe();

        // A request already in the ring satisfies the wait synchronously.
        if let Some(existing) = self.snapshot().into_iter().find(|entry| {
            glob_match(url_glob, &entry.request.url)
                && filter.is_none_or(|f| f.matches_request(&entry.request))
        }) {
            return Ok(existing.request);
        }

        tokio::time::timeout(deadline, async move {
            loop {
                match events.recv().await {
                    Ok(ObserverEvent::Request(request)) => {
                        if glob_match(url_glob, &request.url)
                            && filter.is_none_or(|f| f.matches_request(&request))
                        {
                            return Ok(request);
                        }
                    }
                    Ok(ObserverEvent::TransportLost) => {
                        return Err(NetworkError::Cdp(CdpError::ConnectionLost))
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(NetworkError::Aborted)
                    }
                }
            }
        })
        .await
        .map_err(|_| NetworkError::Timeout(deadline))?
    }

    async fn wait_for_response(
        &self,
        url_glob: &str,
        filter: Option<&NetworkFilter>,
        deadline: Duration,
    ) -> Result<NetworkResponse, NetworkError> {
        self.check_transport()?;
        let mut events = self.events.subscribe();

        if let Some(existing) = self.snapshot().into_iter().find_map(|entry| {
            entry.response.filter(|response| {
                glob_match(url_glob, &response.url)
                    && filter.is_none_or(|f| f.matches_response(response))
            })
        }) {
            return Ok(existing);
        }

        tokio::time::timeout(deadline, async move {
            loop {
                match events.recv().await {
                    Ok(ObserverEvent::Response(response)) => {
                        if glob_match(url_glob, &response.url)
                            && filter.is_none_or(|f| f.matches_response(&response))
                        {
                            return Ok(response);
                        }
                    }
                    Ok(ObserverEvent::TransportLost) => {
                        return Err(NetworkError::Cdp(CdpError::ConnectionLost))
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(NetworkError::Aborted)
                    }
                }
            }
        })
        .await
        .map_err(|_| NetworkError::Timeout(deadline))?
    }

    async fn wait_for_entry(
        &self,
        url_glob: &str,
        filter: Option<&NetworkFilter>,
        deadline: Duration,
    ) -> Result<NetworkEntry, NetworkError> {
        self.check_transport()?;
        let mut events = self.events.subscribe();

        if let Some(existing) = self
            .snapshot()
            .into_iter()
            .find(|entry| entry.is_complete() && Self::entry_matches(entry, url_glob, filter))
        {
            return Ok(existing);
        }

        tokio::time::timeout(deadline, async move {
            loop {
                match events.recv().await {
                    Ok(ObserverEvent::Entry(entry)) => {
                        if Self::entry_matches(&entry, url_glob, filter) {
                            return Ok(entry);
                        }
                    }
                    Ok(ObserverEvent::TransportLost) => {
                        return Err(NetworkError::Cdp(CdpError::ConnectionLost))
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(NetworkError::Aborted)
                    }
                }
            }
        })
        .await
        .map_err(|_| NetworkError::Timeout(deadline))?
    }

    /// Wait until a specific entry completes. With `fail_on_eviction`
    /// the wait resolves early with `EntryEvicted` when the ring drops
    /// the entry; otherwise eviction lets the deadline run out.
    async fn wait_for_entry_id(
        &self,
        request_id: &str,
        deadline: Duration,
        fail_on_eviction: bool,
    ) -> Result<NetworkEntry, NetworkError> {
        self.check_transport()?;
        let mut events = self.events.subscribe();

        if let Some(existing) = self.entry(request_id).filter(NetworkEntry::is_complete) {
            return Ok(existing);
        }

        tokio::time::timeout(deadline, async move {
            loop {
                match events.recv().await {
                    Ok(ObserverEvent::Entry(entry)) => {
                        if entry.request.request_id == request_id {
                            return Ok(entry);
                        }
                    }
                    Ok(ObserverEvent::Evicted(evicted)) => {
                        if fail_on_eviction && evicted == request_id {
                            return Err(NetworkError::EntryEvicted(evicted));
                        }
                    }
                    Ok(ObserverEvent::TransportLost) => {
                        return Err(NetworkError::Cdp(CdpError::ConnectionLost))
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(NetworkError::Aborted)
                    }
                }
            }
        })
        .await
        .map_err(|_| NetworkError::Timeout(deadline))?
    }

    /// Idleness is measured on entry completion, not arrival.
    async fn wait_for_idle(
        &self,
        idle_window: Duration,
        deadline: Duration,
    ) -> Result<(), NetworkError> {
        let started = Instant::now();
        loop {
            let idle_for = self.last_completion.lock().elapsed();
            if idle_for >= idle_window {
                return Ok(());
            }
            if started.elapsed() >= deadline {
                return Err(NetworkError::Timeout(deadline));
            }
            let remaining_window = idle_window - idle_for;
            tokio::time::sleep(remaining_window.min(Duration::from_millis(100))).await;
        }
    }

    fn stats(&self) -> ObserverStats {
        let entries = self.snapshot();
        let mut stats = ObserverStats {
            total_entries: entries.len(),
            ..ObserverStats::default()
        };

        let mut duration_sum = 0.0;
        let mut duration_count = 0usize;

        for entry in &entries {
            *stats
                .resource_kinds
                .entry(entry.request.resource_kind)
                .or_default() += 1;
            if entry.is_complete() {
                stats.complete_entries += 1;
                if let Some(duration) = entry.duration_ms() {
                    duration_sum += duration;
                    duration_count += 1;
                }
                if let Some(response) = &entry.response {
                    *stats.status_codes.entry(response.status).or_default() += 1;
                }
            }
            if entry.is_failed() {
                stats.error_entries += 1;
            }
        }

        stats.pending_entries = stats.total_entries - stats.complete_entries;
        if duration_count > 0 {
            stats.average_duration_ms = duration_sum / duration_count as f64;
        }
        stats
    }
}

/// An async sequence of completed [`NetworkEntry`] values.
///
/// Backed by a bounded queue; when the consumer lags far enough behind
/// that the queue fills, the newest entries are dropped with a warning
/// rather than blocking the observer.
#[derive(Debug)]
pub struct NetworkStream {
    rx: mpsc::Receiver<NetworkEntry>,
    filter: Option<NetworkFilter>,
}

impl NetworkStream {
    /// Next matching entry, or `None` once the observer is gone.
    pub async fn next(&mut self) -> Option<NetworkEntry> {
        loop {
            let entry = self.rx.recv().await?;
            let matches = match &self.filter {
                None => true,
                Some(filter) => {
                    filter.matches_request(&entry.request)
                        && entry
                            .response
                            .as_ref()
                            .is_none_or(|r| filter.matches_response(r))
                }
            };
            if matches {
                return Some(entry);
            }
        }
    }
}

/// Observes network activity for one attached session.
pub struct NetworkObserver {
    session: CdpSession,
    state: Arc<ObserverState>,
    pump: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl std::fmt::Debug for NetworkObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkObserver")
            .field("session_id", &self.session.session_id())
            .field("enabled", &self.is_started())
            .finish_non_exhaustive()
    }
}

impl NetworkObserver {
    /// Create an observer for `session` with `config`.
    ///
    /// Call [`NetworkObserver::start`] to begin capturing.
    pub fn new(session: CdpSession, config: ObserverConfig) -> Self {
        Self {
            session,
            state: Arc::new(ObserverState::new(config)),
            pump: parking_lot::Mutex::new(None),
        }
    }

    /// Whether the observer is capturing.
    pub fn is_started(&self) -> bool {
        self.pump.lock().is_some()
    }

    /// Enable the Network domain and start the event pump.
    #[instrument(level = "debug", skip(self), fields(session_id = %self.session.session_id()))]
    pub async fn start(&self) -> Result<(), NetworkError> {
        if self.is_started() {
            return Ok(());
        }

        let config = &self.state.config;
        self.session
            .send_command::<_, serde_json::Value>(
                "Network.enable",
                Some(EnableParams {
                    max_post_data_size: Some(config.max_post_data_size),
                    max_resource_buffer_size: Some(config.max_resource_buffer_size),
                    max_total_buffer_size: Some(config.max_total_buffer_size),
                }),
            )
            .await?;

        let mut events = self.session.subscribe_events();
        let session_id = self.session.session_id().to_string();
        let state = self.state.clone();
        let body_session = self.session.clone();

        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Closed) => {
                        state.mark_transport_lost();
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "Network pump lagged behind event stream");
                        continue;
                    }
                };
                if event.session_id.as_deref() != Some(&session_id) {
                    continue;
                }

                match event.method.as_str() {
                    "Network.requestWillBeSent" => {
                        if let Some(parsed) = event.parse_params::<RequestWillBeSentEvent>() {
                            state.apply_request_will_be_sent(&parsed);
                        }
                    }
                    "Network.requestWillBeSentExtraInfo" => {
                        if let Some(parsed) = event.parse_params::<RequestWillBeSentExtraInfoEvent>()
                        {
                            state.apply_request_extra_info(&parsed);
                        }
                    }
                    "Network.responseReceived" => {
                        if let Some(parsed) = event.parse_params::<ResponseReceivedEvent>() {
                            state.apply_response_received(&parsed);
                        }
                    }
                    "Network.responseReceivedExtraInfo" => {
                        if let Some(parsed) = event.parse_params::<ResponseReceivedExtraInfoEvent>()
                        {
                            state.apply_response_extra_info(&parsed);
                        }
                    }
                    "Network.loadingFinished" => {
                        if let Some(parsed) = event.parse_params::<LoadingFinishedEvent>() {
                            let completed = state.apply_loading_finished(&parsed);
                            // Eager body capture is fire-and-forget; a
                            // missing body stays absent.
                            if state.config.capture_body
                                && completed.is_some_and(|e| e.response.is_some())
                            {
                                let state = state.clone();
                                let session = body_session.clone();
                                let request_id = parsed.request_id.clone();
                                tokio::spawn(async move {
                                    if let Some(body) =
                                        fetch_body(&session, &request_id).await
                                    {
                                        state.cache_body(&request_id, body);
                                    }
                                });
                            }
                        }
                    }
                    "Network.loadingFailed" => {
                        if let Some(parsed) = event.parse_params::<LoadingFailedEvent>() {
                            state.apply_loading_failed(&parsed);
                        }
                    }
                    "Network.dataReceived" => {
                        if let Some(parsed) = event.parse_params::<DataReceivedEvent>() {
                            state.apply_data_received(&parsed);
                        }
                    }
                    _ => {}
                }
            }
            debug!("Network pump ended");
        });

        *self.pump.lock() = Some(handle);
        Ok(())
    }

    /// Disable the Network domain and stop the pump.
    pub async fn stop(&self) -> Result<(), NetworkError> {
        let Some(handle) = self.pump.lock().take() else {
            return Ok(());
        };
        handle.abort();
        self.session
            .send_command::<_, serde_json::Value>("Network.disable", None::<()>)
            .await?;
        Ok(())
    }

    /// Replace the effective filter.
    ///
    /// Criteria are evaluated at the request stage when the request is
    /// first seen and again at the response stage when the status line
    /// arrives; a response-stage rejection deletes the entry.
    pub fn set_filter(&self, filter: Option<NetworkFilter>) {
        *self.state.filter.lock() = filter;
    }

    /// Snapshot of captured entries, optionally filtered.
    pub fn get_entries(
        &self,
        filter: Option<&NetworkFilter>,
        complete_only: bool,
    ) -> Vec<NetworkEntry> {
        self.state
            .snapshot()
            .into_iter()
            .filter(|entry| !complete_only || entry.is_complete())
            .filter(|entry| match filter {
                None => true,
                Some(filter) => {
                    filter.matches_request(&entry.request)
                        && entry
                            .response
                            .as_ref()
                            .is_none_or(|r| filter.matches_response(r))
                }
            })
            .collect()
    }

    /// One entry by request id.
    pub fn get_entry(&self, request_id: &str) -> Option<NetworkEntry> {
        self.state.entry(request_id)
    }

    /// Captured requests, optionally filtered.
    pub fn get_requests(&self, filter: Option<&NetworkFilter>) -> Vec<NetworkRequest> {
        self.state
            .snapshot()
            .into_iter()
            .map(|entry| entry.request)
            .filter(|request| filter.is_none_or(|f| f.matches_request(request)))
            .collect()
    }

    /// Captured responses, optionally filtered.
    pub fn get_responses(&self, filter: Option<&NetworkFilter>) -> Vec<NetworkResponse> {
        self.state
            .snapshot()
            .into_iter()
            .filter_map(|entry| entry.response)
            .filter(|response| filter.is_none_or(|f| f.matches_response(response)))
            .collect()
    }

    /// Wait for the first request matching `url_glob` (and `filter`).
    ///
    /// Resolves synchronously when a captured request already matches.
    pub async fn wait_for_request(
        &self,
        url_glob: &str,
        filter: Option<&NetworkFilter>,
        deadline: Duration,
    ) -> Result<NetworkRequest, NetworkError> {
        self.state.wait_for_request(url_glob, filter, deadline).await
    }

    /// Wait for the first response matching `url_glob` (and `filter`).
    pub async fn wait_for_response(
        &self,
        url_glob: &str,
        filter: Option<&NetworkFilter>,
        deadline: Duration,
    ) -> Result<NetworkResponse, NetworkError> {
        self.state
            .wait_for_response(url_glob, filter, deadline)
            .await
    }

    /// Wait for the first complete entry matching `url_glob` (and
    /// `filter`).
    pub async fn wait_for_entry(
        &self,
        url_glob: &str,
        filter: Option<&NetworkFilter>,
        deadline: Duration,
    ) -> Result<NetworkEntry, NetworkError> {
        self.state.wait_for_entry(url_glob, filter, deadline).await
    }

    /// Wait for one specific exchange to complete.
    pub async fn wait_for_entry_id(
        &self,
        request_id: &str,
        deadline: Duration,
        fail_on_eviction: bool,
    ) -> Result<NetworkEntry, NetworkError> {
        self.state
            .wait_for_entry_id(request_id, deadline, fail_on_eviction)
            .await
    }

    /// Wait until no entry has completed for `idle_window`.
    pub async fn wait_for_idle(
        &self,
        idle_window: Duration,
        deadline: Duration,
    ) -> Result<(), NetworkError> {
        self.state.wait_for_idle(idle_window, deadline).await
    }

    /// Stream completed entries as they finish, in finish order.
    pub fn stream(&self, filter: Option<NetworkFilter>) -> NetworkStream {
        let (tx, rx) = mpsc::channel(self.state.config.stream_queue_size);
        self.state.streams.lock().push(tx);
        NetworkStream { rx, filter }
    }

    /// Response body for an exchange: the cached copy when present,
    /// otherwise fetched over CDP. `None` when the browser no longer
    /// holds the body.
    pub async fn get_response_body(&self, request_id: &str) -> Option<Bytes> {
        if let Some(cached) = self.state.cached_body(request_id) {
            return Some(cached);
        }
        let body = fetch_body(&self.session, request_id).await?;
        self.state.cache_body(request_id, body.clone());
        Some(body)
    }

    /// Drop all captured entries.
    pub fn clear(&self) {
        self.state.clear();
    }

    /// Statistics over the current ring.
    pub fn stats(&self) -> ObserverStats {
        self.state.stats()
    }
}

impl Drop for NetworkObserver {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}

async fn fetch_body(session: &CdpSession, request_id: &str) -> Option<Bytes> {
    let result: GetResponseBodyResult = session
        .send_command(
            "Network.getResponseBody",
            Some(GetResponseBodyParams {
                request_id: request_id.to_string(),
            }),
        )
        .await
        .ok()?;

    if result.base64_encoded {
        base64::engine::general_purpose::STANDARD
            .decode(result.body)
            .ok()
            .map(Bytes::from)
    } else {
        Some(Bytes::from(result.body.into_bytes()))
    }
}

#[cfg(test)]
mod tests;
