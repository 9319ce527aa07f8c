//! Flat-mode session management.
//!
//! In flat-session mode every attached target appears as a first-class
//! endpoint on the shared connection, addressed by `sessionId`. The
//! [`SessionRouter`] issues attach/detach commands, hands out
//! [`CdpSession`] handles, and routes session-scoped events to the
//! handlers registered for `(session, event)` pairs in registration
//! order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

use crate::connection::CdpConnection;
use crate::error::CdpError;
use crate::protocol::target_domain::{AttachToTargetParams, AttachToTargetResult, DetachFromTargetParams};
use crate::transport::CdpEvent;

/// Identifies a registered event handler so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Key for the root (sessionless) browser endpoint.
const ROOT_SESSION: &str = "";

type EventHandler = Arc<dyn Fn(&CdpEvent) + Send + Sync>;

#[derive(Default)]
struct HandlerTable {
    /// (session, event) -> handlers in registration order.
    by_key: HashMap<(String, String), Vec<(HandlerId, EventHandler)>>,
}

struct SessionRecord {
    target_id: String,
    detached: Arc<AtomicBool>,
}

/// Routes session-scoped traffic over one shared connection.
pub struct SessionRouter {
    connection: Arc<CdpConnection>,
    handlers: Arc<parking_lot::Mutex<HandlerTable>>,
    sessions: Arc<parking_lot::Mutex<HashMap<String, SessionRecord>>>,
    next_handler_id: AtomicU64,
    dispatch_handle: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for SessionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRouter")
            .field("sessions", &self.sessions.lock().len())
            .finish_non_exhaustive()
    }
}

impl SessionRouter {
    /// Create a router over the given connection and start its dispatch
    /// task.
    pub fn new(connection: Arc<CdpConnection>) -> Self {
        let handlers: Arc<parking_lot::Mutex<HandlerTable>> =
            Arc::new(parking_lot::Mutex::new(HandlerTable::default()));

        let mut events = connection.subscribe_events();
        let dispatch_handlers = handlers.clone();
        let dispatch_handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "Session dispatch lagged behind event stream");
                        continue;
                    }
                };
                Self::dispatch(&dispatch_handlers, &event);
            }
            debug!("Session dispatch task ended");
        });

        Self {
            connection,
            handlers,
            sessions: Arc::new(parking_lot::Mutex::new(HashMap::new())),
            next_handler_id: AtomicU64::new(1),
            dispatch_handle,
        }
    }

    /// Invoke every handler registered for this event, in registration
    /// order. A panicking handler is logged and does not stop delivery
    /// to the remaining handlers.
    fn dispatch(handlers: &parking_lot::Mutex<HandlerTable>, event: &CdpEvent) {
        let session = event.session_id.as_deref().unwrap_or(ROOT_SESSION);
        let key = (session.to_string(), event.method.clone());

        let to_call: Vec<EventHandler> = {
            let table = handlers.lock();
            table
                .by_key
                .get(&key)
                .map(|entries| entries.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };

        for handler in to_call {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler(event);
            }));
            if outcome.is_err() {
                warn!(method = %event.method, session_id = %session, "Event handler panicked");
            }
        }
    }

    /// Attach to a target in flat mode and return a session handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser rejects the attach.
    #[instrument(level = "debug", skip(self))]
    pub async fn attach(&self, target_id: &str) -> Result<CdpSession, CdpError> {
        let result: AttachToTargetResult = self
            .connection
            .send_command(
                "Target.attachToTarget",
                Some(AttachToTargetParams {
                    target_id: target_id.to_string(),
                    flatten: Some(true),
                }),
                None,
            )
            .await?;

        let detached = Arc::new(AtomicBool::new(false));
        self.sessions.lock().insert(
            result.session_id.clone(),
            SessionRecord {
                target_id: target_id.to_string(),
                detached: detached.clone(),
            },
        );

        debug!(session_id = %result.session_id, target_id, "Attached to target");
        Ok(CdpSession {
            connection: self.connection.clone(),
            session_id: result.session_id,
            target_id: target_id.to_string(),
            detached,
        })
    }

    /// Detach a session and drop its local state.
    ///
    /// The session handle becomes terminal: further sends through it fail
    /// with `SessionNotFound` without touching the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if the detach command fails; local state is
    /// removed regardless.
    #[instrument(level = "debug", skip(self))]
    pub async fn detach(&self, session_id: &str) -> Result<(), CdpError> {
        self.mark_detached(session_id);

        self.connection
            .send_command::<_, serde_json::Value>(
                "Target.detachFromTarget",
                Some(DetachFromTargetParams {
                    session_id: Some(session_id.to_string()),
                }),
                None,
            )
            .await?;
        Ok(())
    }

    /// Mark a session terminal without issuing a detach command.
    ///
    /// Used when the browser reports the target gone on its own.
    pub fn mark_detached(&self, session_id: &str) {
        if let Some(record) = self.sessions.lock().remove(session_id) {
            record.detached.store(true, Ordering::SeqCst);
        }
        self.handlers
            .lock()
            .by_key
            .retain(|(session, _), _| session != session_id);
    }

    /// The target a session is attached to, if the session is live.
    pub fn target_of(&self, session_id: &str) -> Option<String> {
        self.sessions
            .lock()
            .get(session_id)
            .map(|record| record.target_id.clone())
    }

    /// Register a handler for `(session_id, event)`.
    ///
    /// Pass an empty session id to observe root-session events. Handlers
    /// run synchronously on the dispatch path and must not block; they
    /// may hand work to the runtime.
    pub fn on<F>(&self, session_id: &str, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&CdpEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        let key = (session_id.to_string(), event.to_string());
        self.handlers
            .lock()
            .by_key
            .entry(key)
            .or_default()
            .push((id, Arc::new(handler)));
        trace!(session_id, event, handler_id = ?id, "Registered event handler");
        id
    }

    /// Remove a handler previously registered with [`SessionRouter::on`].
    pub fn off(&self, session_id: &str, event: &str, handler_id: HandlerId) {
        let key = (session_id.to_string(), event.to_string());
        let mut table = self.handlers.lock();
        if let Some(entries) = table.by_key.get_mut(&key) {
            entries.retain(|(id, _)| *id != handler_id);
            if entries.is_empty() {
                table.by_key.remove(&key);
            }
        }
    }

    /// The connection this router multiplexes over.
    pub fn connection(&self) -> &Arc<CdpConnection> {
        &self.connection
    }
}

impl Drop for SessionRouter {
    fn drop(&mut self) {
        self.dispatch_handle.abort();
    }
}

/// A handle to one attached target over the shared connection.
#[derive(Debug, Clone)]
pub struct CdpSession {
    connection: Arc<CdpConnection>,
    session_id: String,
    target_id: String,
    detached: Arc<AtomicBool>,
}

impl CdpSession {
    /// The browser-assigned session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The target this session is attached to.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Whether the session has been detached.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Send a command addressed to this session.
    ///
    /// # Errors
    ///
    /// Fails with `SessionNotFound` once the session is terminal, without
    /// contacting the wire.
    pub async fn send_command<P, R>(&self, method: &str, params: Option<P>) -> Result<R, CdpError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        if self.is_detached() {
            return Err(CdpError::SessionNotFound(self.session_id.clone()));
        }
        self.connection
            .send_command(method, params, Some(&self.session_id))
            .await
    }

    /// Send a command with an explicit deadline.
    ///
    /// # Errors
    ///
    /// Same as [`CdpSession::send_command`], plus `Timeout` on expiry.
    pub async fn send_command_with_timeout<P, R>(
        &self,
        method: &str,
        params: Option<P>,
        timeout: Duration,
    ) -> Result<R, CdpError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        if self.is_detached() {
            return Err(CdpError::SessionNotFound(self.session_id.clone()));
        }
        self.connection
            .send_command_with_timeout(method, params, Some(&self.session_id), timeout)
            .await
    }

    /// Subscribe to the raw event stream of the underlying connection.
    ///
    /// Callers filter by [`CdpEvent::session_id`]; the router offers
    /// keyed registration as the higher-level alternative.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<CdpEvent> {
        self.connection.subscribe_events()
    }

    /// The shared connection.
    pub fn connection(&self) -> &Arc<CdpConnection> {
        &self.connection
    }
}

#[cfg(test)]
mod tests;
