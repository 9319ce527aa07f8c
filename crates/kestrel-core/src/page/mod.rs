//! Page control.
//!
//! A [`Page`] drives one browser tab. Pages are materialized from
//! `Target.targetCreated` events by their owning context's target
//! listener — whether the tab came from `new_page()` or was opened by
//! in-page script — and start out without a session. The session is
//! attached lazily on first use; the first attach also runs the
//! context-provided setup hook (options, init scripts, bindings,
//! routes), so externally opened pages are configured the same way as
//! explicitly created ones.

pub mod binding;
pub mod content;
pub mod emulation;
pub mod evaluate;
pub mod input;
pub mod navigation;
pub mod query;
pub mod routing;
pub mod selector;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kestrel_cdp::protocol::page::{FrameNavigatedEvent, GetFrameTreeResult};
use kestrel_cdp::protocol::target_domain::CloseTargetParams;
use kestrel_cdp::{CdpSession, SessionRouter};
use tracing::{debug, instrument};

use crate::error::PageError;
use crate::network::{NetworkObserver, ObserverConfig};

pub use binding::BindingCallback;
pub use emulation::Viewport;
pub use input::{ClickOptions, Modifier, MouseButton, SelectBy};
pub use navigation::{GotoBuilder, NavigateKind};
pub use query::{ElementHandle, ElementState};
pub use routing::{Route, RoutePattern, RouteRegistry};

/// One-time configuration applied when a page's session first attaches.
pub(crate) type PageSetupHook = Arc<
    dyn for<'a> Fn(&'a Page) -> Pin<Box<dyn Future<Output = Result<(), PageError>> + Send + 'a>>
        + Send
        + Sync,
>;

/// Lifecycle state of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// The initial document is still loading.
    Loading,
    /// The document finished loading.
    Loaded,
    /// The renderer crashed; operations fail until a reload.
    Crashed,
    /// The page is closed. Terminal.
    Closed,
}

/// The lazily attached session and the main frame it resolved.
#[derive(Clone)]
pub(crate) struct PageSession {
    pub(crate) session: CdpSession,
    pub(crate) frame_id: String,
}

/// One browser tab.
pub struct Page {
    router: Arc<SessionRouter>,
    target_id: String,
    context_id: Option<String>,
    state: Arc<parking_lot::RwLock<PageState>>,
    url: Arc<parking_lot::RwLock<String>>,
    /// Present once the session has been attached.
    attached: parking_lot::RwLock<Option<PageSession>>,
    /// Serializes the first attach.
    attach_lock: tokio::sync::Mutex<()>,
    /// Run once, right after the first attach.
    setup: parking_lot::Mutex<Option<PageSetupHook>>,
    observer: parking_lot::Mutex<Option<Arc<NetworkObserver>>>,
    routes: tokio::sync::Mutex<Option<Arc<RouteRegistry>>>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("target_id", &self.target_id)
            .field("state", &*self.state.read())
            .field("url", &*self.url.read())
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Materialize a page record for a known target.
    ///
    /// No wire traffic happens here; the session attaches on first use.
    pub(crate) fn new(
        router: Arc<SessionRouter>,
        target_id: impl Into<String>,
        context_id: Option<String>,
        initial_url: impl Into<String>,
        setup: Option<PageSetupHook>,
    ) -> Arc<Self> {
        Arc::new(Self {
            router,
            target_id: target_id.into(),
            context_id: context_id.filter(|id| !id.is_empty()),
            state: Arc::new(parking_lot::RwLock::new(PageState::Loading)),
            url: Arc::new(parking_lot::RwLock::new(initial_url.into())),
            attached: parking_lot::RwLock::new(None),
            attach_lock: tokio::sync::Mutex::new(()),
            setup: parking_lot::Mutex::new(setup),
            observer: parking_lot::Mutex::new(None),
            routes: tokio::sync::Mutex::new(None),
        })
    }

    /// The page's target id.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// The owning context id; `None` for the default context.
    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    /// Whether a session is currently attached.
    pub fn is_attached(&self) -> bool {
        self.attached.read().is_some()
    }

    /// The session router the page registers handlers with.
    pub(crate) fn router(&self) -> &Arc<SessionRouter> {
        &self.router
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PageState {
        *self.state.read()
    }

    /// The last URL observed for the main frame, without touching the
    /// wire. [`Page::url`](content) fetches the live value.
    pub fn last_known_url(&self) -> String {
        self.url.read().clone()
    }

    /// Whether the page is closed.
    pub fn is_closed(&self) -> bool {
        self.state() == PageState::Closed
    }

    /// Fail unless the page can accept operations.
    pub(crate) fn check_open(&self) -> Result<(), PageError> {
        match self.state() {
            PageState::Closed => Err(PageError::Closed),
            PageState::Crashed => Err(PageError::Crashed),
            _ => Ok(()),
        }
    }

    pub(crate) fn set_state(&self, state: PageState) {
        *self.state.write() = state;
    }

    pub(crate) fn set_url(&self, url: impl Into<String>) {
        *self.url.write() = url.into();
    }

    /// The attached session, attaching on first use.
    ///
    /// The first attach enables the Page and Runtime domains, resolves
    /// the main frame, installs crash/navigation tracking, and runs the
    /// context's setup hook before any concurrent caller proceeds.
    pub(crate) async fn ensure_attached(&self) -> Result<PageSession, PageError> {
        if let Some(attached) = self.attached.read().clone() {
            return Ok(attached);
        }

        let _guard = self.attach_lock.lock().await;
        if let Some(attached) = self.attached.read().clone() {
            return Ok(attached);
        }
        self.check_open()?;

        let attached = self.attach_session().await?;
        *self.attached.write() = Some(attached.clone());

        // First-use configuration. The attach lock is still held, so a
        // second caller waits until the page is configured; re-entrant
        // calls from inside the hook take the fast path above.
        let setup = self.setup.lock().take();
        if let Some(setup) = setup {
            setup(self).await?;
        }

        Ok(attached)
    }

    #[instrument(level = "debug", skip(self), fields(target_id = %self.target_id))]
    async fn attach_session(&self) -> Result<PageSession, PageError> {
        let session = self.router.attach(&self.target_id).await?;

        session
            .send_command::<_, serde_json::Value>("Page.enable", None::<()>)
            .await?;
        session
            .send_command::<_, serde_json::Value>("Runtime.enable", None::<()>)
            .await?;

        let frame_tree: GetFrameTreeResult =
            session.send_command("Page.getFrameTree", None::<()>).await?;
        let main_frame = frame_tree.frame_tree.frame;
        if !main_frame.url.is_empty() {
            self.set_url(main_frame.url.clone());
        }

        let crash_state = self.state.clone();
        self.router
            .on(session.session_id(), "Inspector.targetCrashed", move |_| {
                debug!("Renderer crashed");
                *crash_state.write() = PageState::Crashed;
            });

        let load_state = self.state.clone();
        self.router
            .on(session.session_id(), "Page.loadEventFired", move |_| {
                let mut state = load_state.write();
                if *state == PageState::Loading {
                    *state = PageState::Loaded;
                }
            });

        let url_cache = self.url.clone();
        let tracked_frame = main_frame.id.clone();
        self.router
            .on(session.session_id(), "Page.frameNavigated", move |event| {
                if let Some(parsed) = event.parse_params::<FrameNavigatedEvent>() {
                    if parsed.frame.id == tracked_frame {
                        *url_cache.write() = parsed.frame.url;
                    }
                }
            });

        Ok(PageSession {
            session,
            frame_id: main_frame.id,
        })
    }

    /// The attached session, attaching on first use.
    pub async fn session(&self) -> Result<CdpSession, PageError> {
        Ok(self.ensure_attached().await?.session)
    }

    /// Session plus main frame id, for lifecycle waiters.
    pub(crate) async fn session_and_frame(&self) -> Result<(CdpSession, String), PageError> {
        let attached = self.ensure_attached().await?;
        Ok((attached.session, attached.frame_id))
    }

    /// The network observer for this page, creating (and starting) it on
    /// first use.
    pub async fn network(&self) -> Result<Arc<NetworkObserver>, PageError> {
        self.network_with_config(ObserverConfig::default()).await
    }

    /// The network observer, created with `config` when absent.
    pub async fn network_with_config(
        &self,
        config: ObserverConfig,
    ) -> Result<Arc<NetworkObserver>, PageError> {
        let session = self.session().await?;
        let existing = self.observer.lock().clone();
        if let Some(observer) = existing {
            return Ok(observer);
        }
        let observer = Arc::new(NetworkObserver::new(session, config));
        observer
            .start()
            .await
            .map_err(|e| PageError::CreateFailed(e.to_string()))?;
        *self.observer.lock() = Some(observer.clone());
        Ok(observer)
    }

    /// Bring the tab to the foreground. The "active page" hint this
    /// feeds is informational and eventually consistent.
    pub async fn bring_to_front(&self) -> Result<(), PageError> {
        let session = self.session().await?;
        session
            .send_command::<_, serde_json::Value>("Page.bringToFront", None::<()>)
            .await?;
        Ok(())
    }

    /// Mark the page closed without wire traffic; used when the browser
    /// reports the target gone on its own.
    pub(crate) fn mark_closed(&self) {
        self.set_state(PageState::Closed);
        if let Some(attached) = self.attached.read().clone() {
            self.router.mark_detached(attached.session.session_id());
        }
    }

    /// Mark the page crashed; a reload recovers it.
    pub(crate) fn mark_crashed(&self) {
        let mut state = self.state.write();
        if *state != PageState::Closed {
            *state = PageState::Crashed;
        }
    }

    /// Close the page. Terminal; detaches the session if one was
    /// attached.
    ///
    /// Safe to call on an already-closed page.
    #[instrument(level = "debug", skip(self), fields(target_id = %self.target_id))]
    pub async fn close(&self) -> Result<(), PageError> {
        if self.is_closed() {
            return Ok(());
        }
        self.set_state(PageState::Closed);

        let observer = self.observer.lock().take();
        if let Some(observer) = observer {
            let _ = observer.stop().await;
        }

        let attached = self.attached.read().clone();
        let result = self
            .router
            .connection()
            .send_command::<_, serde_json::Value>(
                "Target.closeTarget",
                Some(CloseTargetParams {
                    target_id: self.target_id.clone(),
                }),
                None,
            )
            .await;
        if let Some(attached) = attached {
            self.router.mark_detached(attached.session.session_id());
        }
        result?;
        Ok(())
    }
}
