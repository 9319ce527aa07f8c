//! Browsing contexts.
//!
//! A [`BrowserContext`] owns the pages of one isolation boundary. Page
//! records are materialized by the context's target listener (the
//! `target_events` submodule) from `Target.targetCreated` events — the
//! single path for every page, whether it came from
//! [`BrowserContext::new_page`] or was opened by in-page script — and
//! their sessions attach lazily on first use, at which point the
//! context's options, init scripts, bindings, and routes are applied. Closing the default context closes
//! only its pages; closing a non-default context additionally disposes
//! it in the browser.

pub mod options;
pub(crate) mod target_events;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kestrel_cdp::protocol::browser::GrantPermissionsParams;
use kestrel_cdp::protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use kestrel_cdp::protocol::storage::{
    ClearCookiesParams, GetCookiesParams, GetCookiesResult, SetCookiesParams,
};
use kestrel_cdp::protocol::target_domain::{
    CreateTargetParams, CreateTargetResult, DisposeBrowserContextParams, TargetInfo,
};
use kestrel_cdp::{CdpConnection, SessionRouter};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::cookies::CookieRecord;
use crate::error::{ContextError, PageError};
use crate::page::binding::BindingCallback;
use crate::page::routing::{RouteHandlerFn, RoutePattern};
use crate::page::{Page, PageSetupHook, Route};
use crate::target::TargetTracker;

pub use options::{ContextOptions, ContextOptionsBuilder, Geolocation};

/// One isolation boundary and its pages.
pub struct BrowserContext {
    connection: Arc<CdpConnection>,
    router: Arc<SessionRouter>,
    tracker: Arc<TargetTracker>,
    /// `None` is the default context.
    context_id: Option<String>,
    options: ContextOptions,
    pages: tokio::sync::Mutex<Vec<Arc<Page>>>,
    init_scripts: tokio::sync::Mutex<Vec<String>>,
    bindings: tokio::sync::Mutex<Vec<(String, BindingCallback)>>,
    routes: tokio::sync::Mutex<Vec<(RoutePattern, RouteHandlerFn)>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for BrowserContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserContext")
            .field("context_id", &self.context_id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl BrowserContext {
    pub(crate) fn new(
        connection: Arc<CdpConnection>,
        router: Arc<SessionRouter>,
        tracker: Arc<TargetTracker>,
        context_id: Option<String>,
        options: ContextOptions,
    ) -> Self {
        Self {
            connection,
            router,
            tracker,
            // An empty id from the wire means the default context.
            context_id: context_id.filter(|id| !id.is_empty()),
            options,
            pages: tokio::sync::Mutex::new(Vec::new()),
            init_scripts: tokio::sync::Mutex::new(Vec::new()),
            bindings: tokio::sync::Mutex::new(Vec::new()),
            routes: tokio::sync::Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Start the target listener that materializes pages for this
    /// context from tracker events.
    pub(crate) fn start_tracking(self: &Arc<Self>) {
        target_events::start_target_event_listener(self);
    }

    /// Apply context-wide settings that live on the browser connection
    /// rather than on individual pages.
    pub(crate) async fn apply_context_settings(&self) -> Result<(), ContextError> {
        if !self.options.permissions.is_empty() {
            self.connection
                .send_command::<_, serde_json::Value>(
                    "Browser.grantPermissions",
                    Some(GrantPermissionsParams {
                        permissions: self.options.permissions.clone(),
                        origin: None,
                        browser_context_id: self.context_id.clone(),
                    }),
                    None,
                )
                .await?;
        }
        if !self.options.storage_state_cookies.is_empty() {
            self.add_cookies(self.options.storage_state_cookies.clone())
                .await?;
        }
        Ok(())
    }

    /// The context id; `None` for the default context.
    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    /// Whether this is the default context.
    pub fn is_default(&self) -> bool {
        self.context_id.is_none()
    }

    /// The context options.
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Whether the context is closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<(), ContextError> {
        if self.is_closed() {
            Err(ContextError::Closed)
        } else {
            Ok(())
        }
    }

    /// Whether a target belongs to this context.
    ///
    /// The default context matches targets that carry no context id.
    pub(crate) fn accepts_target(&self, info: &TargetInfo) -> bool {
        target_events::target_matches_context(self.context_id.as_deref(), info)
    }

    /// The first-attach hook handed to every page of this context.
    fn setup_hook(self: &Arc<Self>) -> PageSetupHook {
        let weak = Arc::downgrade(self);
        Arc::new(move |page: &Page| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(context) = weak.upgrade() {
                    context.apply_page_options(page).await?;
                }
                Ok(())
            })
        })
    }

    /// Materialize (or look up) the page record for a target.
    ///
    /// This is the single registration path, shared by `new_page()` and
    /// the target listener; whichever runs first wins, the other gets
    /// the existing record. No session is attached here.
    pub(crate) async fn register_page_target(
        self: &Arc<Self>,
        target_id: &str,
        initial_url: &str,
    ) -> Arc<Page> {
        let mut pages = self.pages.lock().await;
        if let Some(existing) = pages.iter().find(|page| page.target_id() == target_id) {
            return existing.clone();
        }
        let page = Page::new(
            self.router.clone(),
            target_id,
            self.context_id.clone(),
            initial_url,
            Some(self.setup_hook()),
        );
        pages.push(page.clone());
        debug!(target_id, context_id = ?self.context_id, "Page materialized");
        page
    }

    /// Remove a destroyed target's page record, marking it closed.
    pub(crate) async fn remove_page_target(&self, target_id: &str) {
        let mut pages = self.pages.lock().await;
        if let Some(index) = pages.iter().position(|page| page.target_id() == target_id) {
            let page = pages.remove(index);
            page.mark_closed();
            debug!(target_id, "Page removed after target destroyed");
        }
    }

    /// Mark a crashed target's page record.
    pub(crate) async fn crash_page_target(&self, target_id: &str) {
        let pages = self.pages.lock().await;
        if let Some(page) = pages.iter().find(|page| page.target_id() == target_id) {
            page.mark_crashed();
        }
    }

    /// Open a new page at `about:blank`.
    pub async fn new_page(self: &Arc<Self>) -> Result<Arc<Page>, ContextError> {
        self.new_page_with_url("about:blank").await
    }

    /// Open a new page at `url`.
    ///
    /// The page is registered through the same path the target listener
    /// uses; creating it here counts as first use, so the session
    /// attaches and the context options apply before this returns.
    #[instrument(level = "debug", skip(self), fields(context_id = ?self.context_id))]
    pub async fn new_page_with_url(self: &Arc<Self>, url: &str) -> Result<Arc<Page>, ContextError> {
        self.check_open()?;

        let mut params = CreateTargetParams::new(url);
        if let Some(context_id) = &self.context_id {
            params = params.browser_context_id(context_id.clone());
        }
        let result: CreateTargetResult = self
            .connection
            .send_command("Target.createTarget", Some(params), None)
            .await?;

        // The listener may have raced us here; registration is
        // idempotent either way.
        let page = self.register_page_target(&result.target_id, url).await;
        page.ensure_attached()
            .await
            .map_err(|e| ContextError::CreateFailed(e.to_string()))?;
        Ok(page)
    }

    async fn apply_page_options(&self, page: &Page) -> Result<(), PageError> {
        let options = &self.options;

        if let Some(viewport) = options.viewport {
            page.set_viewport(viewport).await?;
        }
        if let Some(user_agent) = &options.user_agent {
            page.set_user_agent(user_agent).await?;
        }
        if !options.extra_http_headers.is_empty() {
            page.set_extra_http_headers(options.extra_http_headers.clone())
                .await?;
        }
        if let Some(geo) = options.geolocation {
            page.set_geolocation(geo.latitude, geo.longitude, geo.accuracy)
                .await?;
        }
        if let Some(locale) = &options.locale {
            page.set_locale(Some(locale)).await?;
        }
        if let Some(timezone) = &options.timezone_id {
            page.set_timezone(timezone).await?;
        }
        if options.offline {
            page.set_offline(true).await?;
        }
        if options.ignore_https_errors {
            let session = page.session().await?;
            session
                .send_command::<_, serde_json::Value>(
                    "Security.setIgnoreCertificateErrors",
                    Some(json!({"ignore": true})),
                )
                .await?;
        }
        if !options.javascript_enabled {
            page.set_javascript_enabled(false).await?;
        }
        if options.bypass_csp {
            page.set_bypass_csp(true).await?;
        }

        let session = page.session().await?;
        for script in self.init_scripts.lock().await.iter() {
            session
                .send_command::<_, serde_json::Value>(
                    "Page.addScriptToEvaluateOnNewDocument",
                    Some(AddScriptToEvaluateOnNewDocumentParams {
                        source: script.clone(),
                    }),
                )
                .await?;
        }
        for (name, callback) in self.bindings.lock().await.iter() {
            page.expose_callback(name, callback.clone()).await?;
        }
        for (pattern, handler) in self.routes.lock().await.iter() {
            page.route_boxed(pattern.clone(), handler.clone())
                .await
                .map_err(|e| PageError::CreateFailed(e.to_string()))?;
        }

        Ok(())
    }

    /// The context's open pages.
    pub async fn pages(&self) -> Vec<Arc<Page>> {
        let mut pages = self.pages.lock().await;
        pages.retain(|page| !page.is_closed());
        pages.clone()
    }

    /// Register a script injected into every new document.
    ///
    /// Applied to attached pages now; unattached pages pick it up when
    /// their session attaches.
    pub async fn add_init_script(&self, source: impl Into<String>) -> Result<(), ContextError> {
        self.check_open()?;
        let source = source.into();
        self.init_scripts.lock().await.push(source.clone());

        for page in self.pages().await {
            if !page.is_attached() {
                continue;
            }
            let session = page
                .session()
                .await
                .map_err(|e| ContextError::CreateFailed(e.to_string()))?;
            session
                .send_command::<_, serde_json::Value>(
                    "Page.addScriptToEvaluateOnNewDocument",
                    Some(AddScriptToEvaluateOnNewDocumentParams {
                        source: source.clone(),
                    }),
                )
                .await
                .map_err(ContextError::Cdp)?;
        }
        Ok(())
    }

    /// Expose a host function on every page of the context.
    pub async fn expose_function<F>(&self, name: &str, callback: F) -> Result<(), ContextError>
    where
        F: Fn(Vec<serde_json::Value>) -> serde_json::Value + Send + Sync + 'static,
    {
        self.check_open()?;
        let callback: BindingCallback = Arc::new(callback);
        self.bindings
            .lock()
            .await
            .push((name.to_string(), callback.clone()));

        for page in self.pages().await {
            if !page.is_attached() {
                continue;
            }
            page.expose_callback(name, callback.clone())
                .await
                .map_err(|e| ContextError::CreateFailed(e.to_string()))?;
        }
        Ok(())
    }

    /// Intercept matching requests on every page of the context.
    pub async fn route<H, Fut>(
        &self,
        pattern: impl Into<RoutePattern>,
        handler: H,
    ) -> Result<(), ContextError>
    where
        H: Fn(Route) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), crate::error::NetworkError>>
            + Send
            + 'static,
    {
        self.check_open()?;
        let pattern = pattern.into();
        let handler: RouteHandlerFn = Arc::new(move |route| Box::pin(handler(route)));
        self.routes
            .lock()
            .await
            .push((pattern.clone(), handler.clone()));

        for page in self.pages().await {
            if !page.is_attached() {
                continue;
            }
            page.route_boxed(pattern.clone(), handler.clone())
                .await
                .map_err(|e| ContextError::CreateFailed(e.to_string()))?;
        }
        Ok(())
    }

    /// Install cookies into the context.
    #[instrument(level = "debug", skip(self, cookies))]
    pub async fn add_cookies(&self, cookies: Vec<CookieRecord>) -> Result<(), ContextError> {
        self.check_open()?;
        debug!(count = cookies.len(), "Adding cookies");

        let params = SetCookiesParams {
            cookies: cookies.iter().map(CookieRecord::to_cdp_param).collect(),
            browser_context_id: self.context_id.clone(),
        };
        self.connection
            .send_command::<_, serde_json::Value>("Storage.setCookies", Some(params), None)
            .await?;
        Ok(())
    }

    /// All cookies of the context.
    pub async fn cookies(&self) -> Result<Vec<CookieRecord>, ContextError> {
        self.check_open()?;
        let result: GetCookiesResult = self
            .connection
            .send_command(
                "Storage.getCookies",
                Some(GetCookiesParams {
                    browser_context_id: self.context_id.clone(),
                }),
                None,
            )
            .await?;
        Ok(result.cookies.into_iter().map(CookieRecord::from).collect())
    }

    /// Cookies applicable to `url`, filtered by domain suffix, path
    /// prefix, and secure-scheme rules.
    pub async fn cookies_for_url(&self, url: &str) -> Result<Vec<CookieRecord>, ContextError> {
        let all = self.cookies().await?;
        let store = crate::cookies::CookieStore::new();
        store.update_from_list(all);
        Ok(store.get_for_url(url))
    }

    /// Remove every cookie of the context.
    pub async fn clear_cookies(&self) -> Result<(), ContextError> {
        self.check_open()?;
        self.connection
            .send_command::<_, serde_json::Value>(
                "Storage.clearCookies",
                Some(ClearCookiesParams {
                    browser_context_id: self.context_id.clone(),
                }),
                None,
            )
            .await?;
        Ok(())
    }

    /// Close the context.
    ///
    /// Closes every page. The default context itself survives (only its
    /// pages close); a non-default context is disposed in the browser.
    /// Safe to call more than once.
    #[instrument(level = "debug", skip(self), fields(context_id = ?self.context_id))]
    pub async fn close(&self) -> Result<(), ContextError> {
        if self.is_closed() {
            return Ok(());
        }
        // The default context only ever closes its pages; it stays
        // usable. Non-default contexts become terminal; their listener
        // notices the closed flag and stops.
        if self.context_id.is_some() {
            self.closed.store(true, Ordering::SeqCst);
        }

        let pages: Vec<Arc<Page>> = self.pages.lock().await.drain(..).collect();
        for page in pages {
            if let Err(e) = page.close().await {
                warn!(target_id = %page.target_id(), error = %e, "Failed to close page");
            }
        }

        if let Some(context_id) = &self.context_id {
            self.connection
                .send_command::<_, serde_json::Value>(
                    "Target.disposeBrowserContext",
                    Some(DisposeBrowserContextParams {
                        browser_context_id: context_id.clone(),
                    }),
                    None,
                )
                .await?;
        }
        Ok(())
    }

    /// The tracker shared with the owning browser.
    pub fn tracker(&self) -> &Arc<TargetTracker> {
        &self.tracker
    }
}
