//! Target discovery and lifecycle tracking.
//!
//! The tracker configures the browser to auto-attach (flat mode, no
//! debugger pause) and to emit discovery events, keeps a registry of
//! known targets, and fans out typed lifecycle events. Each context
//! runs a listener over this stream that materializes page records
//! into its page set (see `context::target_events`). `refresh()` is
//! the explicit reconciliation path: it reads the live target list and
//! diffs it against the registry, emitting the same events for targets
//! that were discovered late or vanished silently.

use std::collections::HashMap;
use std::sync::Arc;

use kestrel_cdp::protocol::target_domain::{
    GetTargetsParams, GetTargetsResult, SetAutoAttachParams, SetDiscoverTargetsParams,
    TargetCrashedEvent, TargetCreatedEvent, TargetDestroyedEvent, TargetInfo,
    TargetInfoChangedEvent,
};
use kestrel_cdp::CdpConnection;
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace, warn};

use crate::error::BrowserError;

/// Kinds of debuggable targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A top-level page (tab).
    Page,
    /// An iframe promoted to its own target.
    Iframe,
    /// A dedicated worker.
    Worker,
    /// A service worker.
    ServiceWorker,
    /// An extension background page.
    BackgroundPage,
    /// Anything else.
    Other,
}

impl TargetKind {
    /// Parse the CDP target type string.
    pub fn parse(s: &str) -> Self {
        match s {
            "page" => Self::Page,
            "iframe" => Self::Iframe,
            "worker" => Self::Worker,
            "service_worker" => Self::ServiceWorker,
            "background_page" => Self::BackgroundPage,
            _ => Self::Other,
        }
    }
}

/// Lifecycle events surfaced to subscribers.
#[derive(Debug, Clone)]
pub enum TargetEvent {
    /// A target appeared.
    Created(TargetInfo),
    /// A target's description changed (URL, title, attachment).
    InfoChanged(TargetInfo),
    /// A target went away.
    Destroyed(String),
    /// A target crashed.
    Crashed {
        /// The crashed target.
        target_id: String,
        /// Browser-reported status.
        status: String,
    },
}

/// Tracks targets of one browser connection.
pub struct TargetTracker {
    connection: Arc<CdpConnection>,
    known: Arc<parking_lot::Mutex<HashMap<String, TargetInfo>>>,
    events: broadcast::Sender<TargetEvent>,
    pump: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl std::fmt::Debug for TargetTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetTracker")
            .field("known", &self.known.lock().len())
            .finish_non_exhaustive()
    }
}

impl TargetTracker {
    /// A tracker over `connection`. Call
    /// [`TargetTracker::enable_auto_attach`] to start receiving events.
    pub fn new(connection: Arc<CdpConnection>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            connection,
            known: Arc::new(parking_lot::Mutex::new(HashMap::new())),
            events,
            pump: parking_lot::Mutex::new(None),
        }
    }

    /// Subscribe to target lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<TargetEvent> {
        self.events.subscribe()
    }

    /// Snapshot of known targets.
    pub fn targets(&self) -> Vec<TargetInfo> {
        self.known.lock().values().cloned().collect()
    }

    /// Known page targets, optionally restricted to one context.
    ///
    /// `None` restricts to the default context.
    pub fn pages_in_context(&self, context_id: Option<&str>) -> Vec<TargetInfo> {
        self.known
            .lock()
            .values()
            .filter(|info| TargetKind::parse(&info.target_type) == TargetKind::Page)
            .filter(|info| info.browser_context_id.as_deref() == context_id)
            .cloned()
            .collect()
    }

    /// One target by id.
    pub fn get(&self, target_id: &str) -> Option<TargetInfo> {
        self.known.lock().get(target_id).cloned()
    }

    /// Configure auto-attach (flat mode, no pause on start), enable
    /// discovery events, and start the tracking pump.
    #[instrument(level = "debug", skip(self))]
    pub async fn enable_auto_attach(&self) -> Result<(), BrowserError> {
        self.connection
            .send_command::<_, serde_json::Value>(
                "Target.setAutoAttach",
                Some(SetAutoAttachParams {
                    auto_attach: true,
                    wait_for_debugger_on_start: false,
                    flatten: Some(true),
                }),
                None,
            )
            .await?;
        self.connection
            .send_command::<_, serde_json::Value>(
                "Target.setDiscoverTargets",
                Some(SetDiscoverTargetsParams { discover: true }),
                None,
            )
            .await?;

        self.start_pump();
        Ok(())
    }

    fn start_pump(&self) {
        let mut pump = self.pump.lock();
        if pump.is_some() {
            return;
        }

        let mut events = self.connection.subscribe_events();
        let known = self.known.clone();
        let out = self.events.clone();

        *pump = Some(tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "Target pump lagged behind event stream");
                        continue;
                    }
                };
                // Discovery events arrive on the root session.
                if event.session_id.is_some() {
                    continue;
                }

                match event.method.as_str() {
                    "Target.targetCreated" => {
                        if let Some(created) = event.parse_params::<TargetCreatedEvent>() {
                            apply_created(&known, &out, created.target_info);
                        }
                    }
                    "Target.targetInfoChanged" => {
                        if let Some(changed) = event.parse_params::<TargetInfoChangedEvent>() {
                            apply_info_changed(&known, &out, changed.target_info);
                        }
                    }
                    "Target.targetDestroyed" => {
                        if let Some(destroyed) = event.parse_params::<TargetDestroyedEvent>() {
                            apply_destroyed(&known, &out, &destroyed.target_id);
                        }
                    }
                    "Target.targetCrashed" => {
                        if let Some(crashed) = event.parse_params::<TargetCrashedEvent>() {
                            debug!(target_id = %crashed.target_id, status = %crashed.status, "Target crashed");
                            let _ = out.send(TargetEvent::Crashed {
                                target_id: crashed.target_id,
                                status: crashed.status,
                            });
                        }
                    }
                    _ => {}
                }
            }
            debug!("Target pump ended");
        }));
    }

    /// One-shot reconciliation against `Target.getTargets`.
    ///
    /// Emits `Created` for live targets the registry missed and
    /// `Destroyed` for registry entries the browser no longer reports.
    #[instrument(level = "debug", skip(self))]
    pub async fn refresh(&self) -> Result<(), BrowserError> {
        let result: GetTargetsResult = self
            .connection
            .send_command("Target.getTargets", Some(GetTargetsParams::default()), None)
            .await?;
        apply_snapshot(&self.known, &self.events, result.target_infos);
        Ok(())
    }
}

impl Drop for TargetTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}

fn apply_created(
    known: &parking_lot::Mutex<HashMap<String, TargetInfo>>,
    out: &broadcast::Sender<TargetEvent>,
    info: TargetInfo,
) {
    let target_id = info.target_id.clone();
    let is_new = known.lock().insert(target_id.clone(), info.clone()).is_none();
    if is_new {
        trace!(target_id = %target_id, kind = %info.target_type, url = %info.url, "Target created");
        let _ = out.send(TargetEvent::Created(info));
    }
}

fn apply_info_changed(
    known: &parking_lot::Mutex<HashMap<String, TargetInfo>>,
    out: &broadcast::Sender<TargetEvent>,
    info: TargetInfo,
) {
    known.lock().insert(info.target_id.clone(), info.clone());
    let _ = out.send(TargetEvent::InfoChanged(info));
}

fn apply_destroyed(
    known: &parking_lot::Mutex<HashMap<String, TargetInfo>>,
    out: &broadcast::Sender<TargetEvent>,
    target_id: &str,
) {
    if known.lock().remove(target_id).is_some() {
        trace!(target_id, "Target destroyed");
        let _ = out.send(TargetEvent::Destroyed(target_id.to_string()));
    }
}

/// Diff a full snapshot against the registry, emitting events for the
/// differences.
fn apply_snapshot(
    known: &parking_lot::Mutex<HashMap<String, TargetInfo>>,
    out: &broadcast::Sender<TargetEvent>,
    live: Vec<TargetInfo>,
) {
    let gone: Vec<String> = {
        let registry = known.lock();
        registry
            .keys()
            .filter(|id| !live.iter().any(|info| &info.target_id == *id))
            .cloned()
            .collect()
    };
    for target_id in gone {
        apply_destroyed(known, out, &target_id);
    }
    for info in live {
        apply_created(known, out, info);
    }
}

#[cfg(test)]
mod tests;
