//! Browser lifecycle.
//!
//! A [`Browser`] is the root object of one browser process or
//! connection: it owns the transport, the session router, the target
//! tracker, the default context, and any non-default contexts. Launch
//! spawns a process and polls the DevTools HTTP side-channel until the
//! WebSocket endpoint is ready; connect attaches to a browser that is
//! already running.

pub mod launcher;

use std::sync::Arc;
use std::time::Duration;

use kestrel_cdp::protocol::browser::GetVersionResult;
use kestrel_cdp::protocol::target_domain::{
    CreateBrowserContextParams, CreateBrowserContextResult,
};
use kestrel_cdp::{CdpConnection, CdpSession, DiscoveryOptions, SessionRouter};
use tempfile::TempDir;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::context::{BrowserContext, ContextOptions};
use crate::error::BrowserError;
use crate::page::Page;
use crate::profile::ProfileLock;
use crate::target::{TargetEvent, TargetTracker};

pub use launcher::{BrowserBuilder, UserDataDir};

/// Lifecycle state of a browser handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserState {
    /// No transport.
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Ready for use.
    Connected,
    /// Close sequence running.
    Closing,
}

/// Grace period between the polite close request and the hard kill.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// The root handle for one browser.
pub struct Browser {
    connection: Arc<CdpConnection>,
    router: Arc<SessionRouter>,
    tracker: Arc<TargetTracker>,
    /// Present only when this handle spawned the process.
    process: Option<parking_lot::Mutex<std::process::Child>>,
    state: parking_lot::RwLock<BrowserState>,
    default_context: Arc<BrowserContext>,
    contexts: tokio::sync::Mutex<Vec<Arc<BrowserContext>>>,
    /// Ephemeral user-data dir, removed when the handle drops.
    _user_data_dir: Option<TempDir>,
    /// Advisory profile lock, released on close.
    profile_lock: parking_lot::Mutex<Option<ProfileLock>>,
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("state", &self.state())
            .field("owned", &self.process.is_some())
            .finish_non_exhaustive()
    }
}

impl Browser {
    /// Builder for launching a browser process.
    pub fn launcher() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    /// Connect to a running browser by WebSocket URL.
    pub async fn connect(ws_url: &str) -> Result<Self, BrowserError> {
        let connection = CdpConnection::connect(ws_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;
        Self::bootstrap(connection, None, None, None).await
    }

    /// Connect to a running browser by HTTP endpoint, discovering the
    /// WebSocket URL through `/json/version`.
    pub async fn connect_over_cdp(
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, BrowserError> {
        let options = DiscoveryOptions::new().timeout(timeout);
        let ws_url = kestrel_cdp::poll_websocket_url(endpoint, &options)
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;
        Self::connect(&ws_url).await
    }

    /// Wire up a fresh connection: session router, target tracking, and
    /// the default context.
    pub(crate) async fn bootstrap(
        connection: CdpConnection,
        process: Option<std::process::Child>,
        user_data_dir: Option<TempDir>,
        profile_lock: Option<ProfileLock>,
    ) -> Result<Self, BrowserError> {
        let connection = Arc::new(connection);
        let router = Arc::new(SessionRouter::new(connection.clone()));
        let tracker = Arc::new(TargetTracker::new(connection.clone()));

        // The default context's listener must be subscribed before
        // discovery starts, or the replay of pre-existing targets (the
        // startup tab included) could slip past it.
        let default_context = Arc::new(BrowserContext::new(
            connection.clone(),
            router.clone(),
            tracker.clone(),
            None,
            ContextOptions::new(),
        ));
        default_context.start_tracking();

        tracker.enable_auto_attach().await?;
        // Pick up targets that predate discovery, in case the browser
        // did not replay them.
        if let Err(e) = tracker.refresh().await {
            warn!(error = %e, "Initial target reconciliation failed");
        }

        // A cheap liveness probe; also warms the version cache.
        let version: GetVersionResult = connection
            .send_command("Browser.getVersion", None::<()>, None)
            .await?;
        debug!(product = %version.product, "Browser identified");

        info!("Browser connected");
        Ok(Self {
            connection,
            router,
            tracker,
            process: process.map(parking_lot::Mutex::new),
            state: parking_lot::RwLock::new(BrowserState::Connected),
            default_context,
            contexts: tokio::sync::Mutex::new(Vec::new()),
            _user_data_dir: user_data_dir,
            profile_lock: parking_lot::Mutex::new(profile_lock),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BrowserState {
        *self.state.read()
    }

    /// Whether the transport is usable.
    pub fn is_connected(&self) -> bool {
        self.state() == BrowserState::Connected && !self.connection.is_closed()
    }

    /// The shared transport.
    pub fn connection(&self) -> &Arc<CdpConnection> {
        &self.connection
    }

    /// The session router.
    pub fn router(&self) -> &Arc<SessionRouter> {
        &self.router
    }

    /// The target tracker.
    pub fn tracker(&self) -> &Arc<TargetTracker> {
        &self.tracker
    }

    /// The default context.
    pub fn default_context(&self) -> &Arc<BrowserContext> {
        &self.default_context
    }

    /// Subscribe to target lifecycle events.
    pub fn on_target_event(&self) -> tokio::sync::broadcast::Receiver<TargetEvent> {
        self.tracker.subscribe()
    }

    /// Reconcile the target registry against the live target list.
    pub async fn refresh_targets(&self) -> Result<(), BrowserError> {
        self.tracker.refresh().await
    }

    fn check_connected(&self) -> Result<(), BrowserError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BrowserError::Closed)
        }
    }

    /// Create a non-default context with `options`.
    #[instrument(level = "debug", skip(self, options))]
    pub async fn new_context(
        &self,
        options: ContextOptions,
    ) -> Result<Arc<BrowserContext>, BrowserError> {
        self.check_connected()?;

        let result: CreateBrowserContextResult = self
            .connection
            .send_command(
                "Target.createBrowserContext",
                Some(CreateBrowserContextParams {
                    dispose_on_detach: None,
                    proxy_server: options.proxy.clone(),
                    proxy_bypass_list: None,
                }),
                None,
            )
            .await?;

        let context = Arc::new(BrowserContext::new(
            self.connection.clone(),
            self.router.clone(),
            self.tracker.clone(),
            Some(result.browser_context_id),
            options,
        ));
        context.start_tracking();
        context
            .apply_context_settings()
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        self.contexts.lock().await.push(context.clone());
        Ok(context)
    }

    /// Non-default contexts created through this handle.
    pub async fn contexts(&self) -> Vec<Arc<BrowserContext>> {
        let mut contexts = self.contexts.lock().await;
        contexts.retain(|context| !context.is_closed());
        contexts.clone()
    }

    /// Open a page in the default context.
    pub async fn new_page(&self) -> Result<Arc<Page>, BrowserError> {
        self.check_connected()?;
        self.default_context
            .new_page()
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))
    }

    /// All open pages, flattened across the default and non-default
    /// contexts.
    pub async fn pages(&self) -> Vec<Arc<Page>> {
        let mut pages = self.default_context.pages().await;
        for context in self.contexts().await {
            pages.extend(context.pages().await);
        }
        pages
    }

    /// The browser's product string, e.g. `Chrome/130.0.6723.58`.
    pub async fn version(&self) -> Result<String, BrowserError> {
        self.check_connected()?;
        let version: GetVersionResult = self
            .connection
            .send_command("Browser.getVersion", None::<()>, None)
            .await?;
        Ok(version.product)
    }

    /// The user agent the browser reports.
    pub async fn user_agent(&self) -> Result<String, BrowserError> {
        self.check_connected()?;
        let version: GetVersionResult = self
            .connection
            .send_command("Browser.getVersion", None::<()>, None)
            .await?;
        Ok(version.user_agent)
    }

    /// Low-level escape hatch: attach a raw session to any target.
    pub async fn new_cdp_session(&self, target_id: &str) -> Result<CdpSession, BrowserError> {
        self.check_connected()?;
        Ok(self.router.attach(target_id).await?)
    }

    /// Close the browser.
    ///
    /// Best-effort sequence: close non-default contexts, close the
    /// default context's pages, ask the browser to exit, close the
    /// transport, kill the process after a grace window, release the
    /// profile lock. Failures are logged and do not stop later steps.
    /// Safe to call on a closed handle.
    #[instrument(level = "info", skip(self))]
    pub async fn close(&self) -> Result<(), BrowserError> {
        {
            let mut state = self.state.write();
            if matches!(*state, BrowserState::Closing | BrowserState::Disconnected) {
                return Ok(());
            }
            *state = BrowserState::Closing;
        }

        for context in self.contexts.lock().await.drain(..) {
            if let Err(e) = context.close().await {
                warn!(error = %e, "Failed to close context");
            }
        }
        if let Err(e) = self.default_context.close().await {
            warn!(error = %e, "Failed to close default context pages");
        }

        // Ask politely first; the process gets a grace window below.
        if let Err(e) = self
            .connection
            .send_command_with_timeout::<_, serde_json::Value>(
                "Browser.close",
                None::<()>,
                None,
                Duration::from_secs(2),
            )
            .await
        {
            debug!(error = %e, "Browser.close failed, will terminate the process");
        }

        self.connection.close();

        if let Some(process) = &self.process {
            let deadline = tokio::time::Instant::now() + KILL_GRACE;
            loop {
                let exited = process.lock().try_wait().ok().flatten().is_some();
                if exited {
                    break;
                }
                if tokio::time::Instant::now() >= deadline {
                    warn!("Browser did not exit in time, killing");
                    let mut child = process.lock();
                    let _ = child.kill();
                    let _ = child.wait();
                    break;
                }
                sleep(Duration::from_millis(100)).await;
            }
        }

        if let Some(lock) = self.profile_lock.lock().take() {
            lock.release();
        }

        *self.state.write() = BrowserState::Disconnected;
        info!("Browser closed");
        Ok(())
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        if let Some(process) = &self.process {
            let mut child = process.lock();
            if child.try_wait().ok().flatten().is_none() {
                let _ = child.kill();
            }
        }
    }
}
