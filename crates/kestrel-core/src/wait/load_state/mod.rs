//! Document load states and the CDP-event-driven waiter behind
//! navigation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kestrel_cdp::protocol::network::{
    LoadingFailedEvent, LoadingFinishedEvent, RequestWillBeSentEvent,
};
use kestrel_cdp::CdpEvent;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, instrument, trace, warn};

use crate::error::WaitError;

/// Lifecycle states a document moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LoadState {
    /// Navigation committed; the new document is replacing the old one.
    #[default]
    Commit,
    /// `DOMContentLoaded` fired.
    DomContentLoaded,
    /// The `load` event fired.
    Load,
    /// `load` fired and the network has been quiet for the idle window.
    NetworkIdle,
}

impl LoadState {
    /// Whether `current` satisfies this target state.
    pub fn is_reached(self, current: Self) -> bool {
        current >= self
    }

    /// Parse the public `wait_until` names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "commit" => Some(Self::Commit),
            "domcontentloaded" => Some(Self::DomContentLoaded),
            "load" => Some(Self::Load),
            "networkidle" => Some(Self::NetworkIdle),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Commit => "commit",
            Self::DomContentLoaded => "domcontentloaded",
            Self::Load => "load",
            Self::NetworkIdle => "networkidle",
        };
        f.write_str(s)
    }
}

/// Default deadline for lifecycle waits.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Quiet window for `NetworkIdle`.
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Tracks one session's load state by consuming CDP events.
#[derive(Debug)]
pub struct LifecycleWaiter {
    current: parking_lot::Mutex<LoadState>,
    events: broadcast::Receiver<CdpEvent>,
    session_id: String,
    frame_id: String,
    pending_requests: Arc<AtomicUsize>,
    pending_ids: parking_lot::Mutex<HashSet<String>>,
}

impl LifecycleWaiter {
    /// A waiter for `session_id`/`frame_id`, starting at `Commit`.
    pub fn new(
        events: broadcast::Receiver<CdpEvent>,
        session_id: impl Into<String>,
        frame_id: impl Into<String>,
    ) -> Self {
        Self {
            current: parking_lot::Mutex::new(LoadState::Commit),
            events,
            session_id: session_id.into(),
            frame_id: frame_id.into(),
            pending_requests: Arc::new(AtomicUsize::new(0)),
            pending_ids: parking_lot::Mutex::new(HashSet::new()),
        }
    }

    /// The last observed state.
    pub fn current(&self) -> LoadState {
        *self.current.lock()
    }

    /// Wait until `target` is reached, with the default deadline.
    pub async fn wait_for(&mut self, target: LoadState) -> Result<(), WaitError> {
        self.wait_for_with_timeout(target, DEFAULT_TIMEOUT).await
    }

    /// Wait until `target` is reached or `deadline` elapses.
    #[instrument(level = "debug", skip(self), fields(target = %target, timeout_ms = deadline.as_millis()))]
    pub async fn wait_for_with_timeout(
        &mut self,
        target: LoadState,
        deadline: Duration,
    ) -> Result<(), WaitError> {
        {
            let current = *self.current.lock();
            if target.is_reached(current) && target != LoadState::NetworkIdle {
                trace!(current = %current, "Target state already reached");
                return Ok(());
            }
        }

        match timeout(deadline, self.drive(target)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(target = %target, "Lifecycle wait timed out");
                Err(WaitError::Timeout(deadline))
            }
        }
    }

    async fn drive(&mut self, target: LoadState) -> Result<(), WaitError> {
        let mut last_activity = Instant::now();

        loop {
            if self.satisfied(target, last_activity) {
                return Ok(());
            }

            // For NetworkIdle we cannot sit in recv() forever: quiet is
            // exactly the absence of events.
            let event = if target == LoadState::NetworkIdle {
                match timeout(Duration::from_millis(100), self.events.recv()).await {
                    Ok(result) => result,
                    Err(_) => {
                        if self.idle_candidate()
                            && last_activity.elapsed() >= NETWORK_IDLE_WINDOW
                        {
                            self.advance(LoadState::NetworkIdle);
                            return Ok(());
                        }
                        continue;
                    }
                }
            } else {
                self.events.recv().await
            };

            let event = match event {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Closed) => return Err(WaitError::PageClosed),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            };

            if event.session_id.as_deref() != Some(&self.session_id) {
                continue;
            }

            match event.method.as_str() {
                "Page.domContentEventFired" => self.advance(LoadState::DomContentLoaded),
                "Page.loadEventFired" => self.advance(LoadState::Load),
                "Network.requestWillBeSent" => {
                    if let Some(request) = event.parse_params::<RequestWillBeSentEvent>() {
                        if request.frame_id.as_deref() == Some(&self.frame_id)
                            && self.pending_ids.lock().insert(request.request_id.clone())
                        {
                            let count = self.pending_requests.fetch_add(1, Ordering::Relaxed) + 1;
                            trace!(request_id = %request.request_id, pending = count, "Request started");
                            last_activity = Instant::now();
                        }
                    }
                }
                "Network.loadingFinished" => {
                    if let Some(finished) = event.parse_params::<LoadingFinishedEvent>() {
                        if self.pending_ids.lock().remove(&finished.request_id) {
                            self.pending_requests.fetch_sub(1, Ordering::Relaxed);
                            last_activity = Instant::now();
                        }
                    }
                }
                "Network.loadingFailed" => {
                    if let Some(failed) = event.parse_params::<LoadingFailedEvent>() {
                        if self.pending_ids.lock().remove(&failed.request_id) {
                            self.pending_requests.fetch_sub(1, Ordering::Relaxed);
                            last_activity = Instant::now();
                        }
                    }
                }
                _ => {}
            }

            if target == LoadState::NetworkIdle && self.idle_candidate() {
                // Confirm the quiet window before declaring idle.
                sleep(NETWORK_IDLE_WINDOW).await;
                if self.idle_candidate() {
                    self.advance(LoadState::NetworkIdle);
                    return Ok(());
                }
            }
        }
    }

    fn satisfied(&self, target: LoadState, last_activity: Instant) -> bool {
        if target == LoadState::NetworkIdle {
            return self.idle_candidate() && last_activity.elapsed() >= NETWORK_IDLE_WINDOW;
        }
        target.is_reached(*self.current.lock())
    }

    fn idle_candidate(&self) -> bool {
        self.pending_requests.load(Ordering::Relaxed) == 0
            && *self.current.lock() >= LoadState::Load
    }

    fn advance(&self, state: LoadState) {
        let mut current = self.current.lock();
        if *current < state {
            debug!(from = %*current, to = %state, "Load state transition");
            *current = state;
        }
    }
}

#[cfg(test)]
mod tests;
