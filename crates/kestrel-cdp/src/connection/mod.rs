//! CDP WebSocket connection management.
//!
//! One connection owns the socket. A dedicated reader task demultiplexes
//! inbound frames: replies are correlated to their waiters via a one-shot
//! slot table keyed by message id, events fan out on a broadcast channel.
//! Senders share a single FIFO write lane; ids are allocated under the
//! same lock that enqueues the frame, so ids grow monotonically in wire
//! order and are never reused while outstanding.

pub mod discovery;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::CdpError;
use crate::transport::{CdpEvent, CdpMessage, CdpReply, CdpRequest};

pub use discovery::{discover_websocket_url, poll_websocket_url, BrowserVersionInfo, DiscoveryOptions};

/// Default timeout for CDP commands.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for the event broadcast channel.
const EVENT_CHANNEL_SIZE: usize = 1024;

type PendingSlots = Arc<parking_lot::Mutex<HashMap<u64, oneshot::Sender<CdpReply>>>>;

/// Event fan-out shared with the reader; dropped on close so that every
/// subscriber observes the end of the stream.
type EventLane = Arc<parking_lot::Mutex<Option<broadcast::Sender<CdpEvent>>>>;

/// A multiplexed CDP connection to one browser.
#[derive(Debug)]
pub struct CdpConnection {
    /// Write lane; frames are flushed in enqueue order.
    tx: mpsc::UnboundedSender<CdpRequest>,
    /// Event fan-out to subscribers.
    event_tx: EventLane,
    /// One-shot reply slots keyed by request id.
    pending: PendingSlots,
    /// Next request id, locked together with the enqueue.
    next_id: parking_lot::Mutex<u64>,
    /// Set once the reader terminates or `close` is called.
    closed: Arc<AtomicBool>,
    /// Handle to the background read task.
    read_handle: tokio::task::JoinHandle<()>,
    /// Handle to the background write task.
    write_handle: tokio::task::JoinHandle<()>,
}

impl CdpConnection {
    /// Connect to a CDP WebSocket endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the WebSocket handshake fails.
    #[instrument(level = "info", skip(ws_url), fields(ws_url = %ws_url))]
    pub async fn connect(ws_url: &str) -> Result<Self, CdpError> {
        info!("Connecting to CDP WebSocket endpoint");
        let (ws_stream, response) = tokio_tungstenite::connect_async(ws_url).await?;
        info!(status = %response.status(), "WebSocket connection established");

        let (write, read) = ws_stream.split();

        let (tx, rx) = mpsc::unbounded_channel::<CdpRequest>();
        let (event_sender, _) = broadcast::channel::<CdpEvent>(EVENT_CHANNEL_SIZE);
        let event_tx: EventLane = Arc::new(parking_lot::Mutex::new(Some(event_sender)));
        let pending: PendingSlots = Arc::new(parking_lot::Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let write_handle = tokio::spawn(Self::write_loop(rx, write));
        debug!("Spawned CDP write loop");

        let read_pending = pending.clone();
        let read_event_tx = event_tx.clone();
        let read_closed = closed.clone();
        let read_handle =
            tokio::spawn(Self::read_loop(read, read_pending, read_event_tx, read_closed));
        debug!("Spawned CDP read loop");

        Ok(Self {
            tx,
            event_tx,
            pending,
            next_id: parking_lot::Mutex::new(1),
            closed,
            read_handle,
            write_handle,
        })
    }

    /// Background task that serializes and writes frames in FIFO order.
    async fn write_loop<S>(mut rx: mpsc::UnboundedReceiver<CdpRequest>, mut sink: S)
    where
        S: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        while let Some(request) = rx.recv().await {
            let id = request.id;
            let method = request.method.clone();

            let json = match serde_json::to_string(&request) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, method = %method, "Failed to serialize CDP request");
                    continue;
                }
            };

            trace!(id, method = %method, frame_len = json.len(), "Writing CDP frame");

            if sink.send(Message::Text(json.into())).await.is_err() {
                warn!("WebSocket sink closed, ending write loop");
                break;
            }
        }
        debug!("CDP write loop ended");
    }

    /// Background task that owns socket reads.
    ///
    /// When the stream terminates, every pending slot is dropped so that
    /// all outstanding waiters resolve with `ConnectionLost`.
    async fn read_loop<S>(
        mut stream: S,
        pending: PendingSlots,
        event_tx: EventLane,
        closed: Arc<AtomicBool>,
    ) where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        while let Some(msg) = stream.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(frame)) => {
                    info!(?frame, "WebSocket closed by remote");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "WebSocket read error, ending read loop");
                    break;
                }
                Ok(_) => continue,
            };

            // Malformed frames are logged and dropped, never terminal.
            let message: CdpMessage = match serde_json::from_str(&text) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, frame_len = text.len(), "Dropping malformed CDP frame");
                    continue;
                }
            };

            match message {
                CdpMessage::Reply(reply) => {
                    let id = reply.id;
                    let slot = pending.lock().remove(&id);
                    match slot {
                        Some(sender) => {
                            trace!(id, has_error = reply.error.is_some(), "Fulfilling reply slot");
                            let _ = sender.send(reply);
                        }
                        None => {
                            // Happens after a waiter timed out and removed
                            // its slot; the late reply is dropped.
                            warn!(id, "Reply for unknown request id, dropping");
                        }
                    }
                }
                CdpMessage::Event(event) => {
                    trace!(method = %event.method, session_id = ?event.session_id, "Dispatching CDP event");
                    if let Some(sender) = event_tx.lock().as_ref() {
                        let _ = sender.send(event);
                    }
                }
            }
        }

        closed.store(true, Ordering::SeqCst);
        // Dropping the sender ends every subscriber's stream, so event
        // pumps and their waiters observe the closure.
        event_tx.lock().take();
        let drained = {
            let mut pending = pending.lock();
            let count = pending.len();
            pending.clear();
            count
        };
        if drained > 0 {
            warn!(waiters = drained, "Connection closed with outstanding waiters");
        }
        debug!("CDP read loop ended");
    }

    /// Whether the connection is still usable.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a CDP command and await its reply with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed, the reply times out,
    /// or the browser answers with a protocol error.
    pub async fn send_command<P, R>(
        &self,
        method: &str,
        params: Option<P>,
        session_id: Option<&str>,
    ) -> Result<R, CdpError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.send_command_with_timeout(method, params, session_id, DEFAULT_TIMEOUT)
            .await
    }

    /// Send a CDP command with an explicit deadline.
    ///
    /// On expiry the reply slot is removed and `Timeout` is returned; a
    /// late reply for that id is then dropped by the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed, the reply times out,
    /// or the browser answers with a protocol error.
    #[instrument(level = "debug", skip(self, params), fields(method = %method, session_id = ?session_id))]
    pub async fn send_command_with_timeout<P, R>(
        &self,
        method: &str,
        params: Option<P>,
        session_id: Option<&str>,
        timeout_duration: Duration,
    ) -> Result<R, CdpError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        if self.is_closed() {
            return Err(CdpError::ConnectionLost);
        }

        let params_value = params.map(serde_json::to_value).transpose()?;
        let (reply_tx, reply_rx) = oneshot::channel();

        // Allocate the id and enqueue under one lock so ids hit the wire
        // in increasing order.
        let id = {
            let mut next_id = self.next_id.lock();
            let id = *next_id;
            *next_id += 1;

            self.pending.lock().insert(id, reply_tx);

            let request = CdpRequest {
                id,
                method: method.to_string(),
                params: params_value,
                session_id: session_id.map(ToString::to_string),
            };
            if self.tx.send(request).is_err() {
                self.pending.lock().remove(&id);
                return Err(CdpError::ConnectionLost);
            }
            id
        };

        trace!(id, "Request queued");

        let reply = match timeout(timeout_duration, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                // Slot dropped by the reader's close drain.
                return Err(CdpError::ConnectionLost);
            }
            Err(_) => {
                self.pending.lock().remove(&id);
                warn!(id, method = %method, "CDP command timed out");
                return Err(CdpError::Timeout(timeout_duration));
            }
        };

        if let Some(error) = reply.error {
            warn!(id, method = %method, code = error.code, error_msg = %error.message, "CDP protocol error");
            return Err(CdpError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        debug!(id, "CDP command completed");
        let result = reply.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(CdpError::from)
    }

    /// Subscribe to every event this connection receives.
    ///
    /// Root-session events carry no `session_id`; flat-mode session
    /// events carry the session they originate from. On a closed
    /// connection the returned receiver reports the stream as ended.
    pub fn subscribe_events(&self) -> broadcast::Receiver<CdpEvent> {
        match self.event_tx.lock().as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(1);
                drop(sender);
                receiver
            }
        }
    }

    /// Close the connection.
    ///
    /// Cancels all outstanding reply slots (their waiters resolve with
    /// `ConnectionLost`), ends every event subscription, stops the
    /// reader and writer, and releases the socket. Safe to call more
    /// than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Closing CDP connection");
        self.read_handle.abort();
        self.write_handle.abort();
        self.event_tx.lock().take();
        self.pending.lock().clear();
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.read_handle.abort();
        self.write_handle.abort();
    }
}

#[cfg(test)]
mod tests;
