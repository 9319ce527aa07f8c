//! Request interception.
//!
//! `route()` pauses matching requests in the Fetch domain and hands each
//! one to a handler as a [`Route`], which must fulfill, abort, or
//! continue it. Handlers are tried newest-first; a handler that declines
//! (returns without resolving) falls through to the next match, and an
//! unclaimed request continues to the network.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::Engine as _;
use kestrel_cdp::protocol::fetch::{
    ContinueRequestParams, EnableParams, ErrorReason, FailRequestParams, FulfillRequestParams,
    HeaderEntry, RequestPattern, RequestPausedEvent,
};
use kestrel_cdp::CdpSession;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::Page;
use crate::error::NetworkError;
use crate::network::types::glob_match;

/// What a route handler matches against.
#[derive(Clone)]
pub enum RoutePattern {
    /// URL glob.
    Glob(String),
    /// Arbitrary URL predicate.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl std::fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Glob(pattern) => f.debug_tuple("Glob").field(pattern).finish(),
            Self::Predicate(_) => f.debug_tuple("Predicate").field(&"<fn>").finish(),
        }
    }
}

impl RoutePattern {
    fn matches(&self, url: &str) -> bool {
        match self {
            Self::Glob(pattern) => glob_match(pattern, url),
            Self::Predicate(predicate) => predicate(url),
        }
    }
}

impl From<&str> for RoutePattern {
    fn from(pattern: &str) -> Self {
        Self::Glob(pattern.to_string())
    }
}

impl From<String> for RoutePattern {
    fn from(pattern: String) -> Self {
        Self::Glob(pattern)
    }
}

pub(crate) type RouteHandlerFn = Arc<
    dyn Fn(Route) -> Pin<Box<dyn Future<Output = Result<(), NetworkError>> + Send>> + Send + Sync,
>;

struct RegisteredRoute {
    pattern: RoutePattern,
    handler: RouteHandlerFn,
}

/// One intercepted request, waiting for a resolution.
#[derive(Clone)]
pub struct Route {
    session: CdpSession,
    request_id: String,
    url: String,
    method: String,
    resource_type: String,
    handled: Arc<AtomicBool>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("request_id", &self.request_id)
            .field("url", &self.url)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl Route {
    /// The paused request's URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The paused request's method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The paused request's resource type string.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Whether a resolution has been issued.
    pub fn is_handled(&self) -> bool {
        self.handled.load(Ordering::SeqCst)
    }

    /// Answer the request with a synthetic response.
    pub fn fulfill(&self) -> FulfillBuilder {
        FulfillBuilder {
            route: self.clone(),
            status: 200,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Fail the request with a network error.
    pub async fn abort(&self, reason: ErrorReason) -> Result<(), NetworkError> {
        self.handled.store(true, Ordering::SeqCst);
        self.session
            .send_command::<_, serde_json::Value>(
                "Fetch.failRequest",
                Some(FailRequestParams {
                    request_id: self.request_id.clone(),
                    error_reason: reason,
                }),
            )
            .await?;
        Ok(())
    }

    /// Let the request through, optionally modified.
    pub fn continue_request(&self) -> ContinueBuilder {
        ContinueBuilder {
            route: self.clone(),
            headers: None,
            method: None,
            post_data: None,
            url: None,
        }
    }
}

/// Builder for [`Route::fulfill`].
#[derive(Debug)]
pub struct FulfillBuilder {
    route: Route,
    status: i64,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl FulfillBuilder {
    /// Response status; defaults to 200.
    #[must_use]
    pub fn status(mut self, status: i64) -> Self {
        self.status = status;
        self
    }

    /// Add a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the `Content-Type` header.
    #[must_use]
    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.header("Content-Type", value)
    }

    /// Response body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Send the synthetic response.
    pub async fn send(self) -> Result<(), NetworkError> {
        self.route.handled.store(true, Ordering::SeqCst);
        let headers = (!self.headers.is_empty()).then(|| {
            self.headers
                .into_iter()
                .map(|(name, value)| HeaderEntry { name, value })
                .collect()
        });
        self.route
            .session
            .send_command::<_, serde_json::Value>(
                "Fetch.fulfillRequest",
                Some(FulfillRequestParams {
                    request_id: self.route.request_id.clone(),
                    response_code: self.status,
                    response_headers: headers,
                    body: self
                        .body
                        .map(|b| base64::engine::general_purpose::STANDARD.encode(b)),
                }),
            )
            .await?;
        Ok(())
    }
}

/// Builder for [`Route::continue_request`].
#[derive(Debug)]
pub struct ContinueBuilder {
    route: Route,
    headers: Option<Vec<(String, String)>>,
    method: Option<String>,
    post_data: Option<Vec<u8>>,
    url: Option<String>,
}

impl ContinueBuilder {
    /// Replace the request headers.
    #[must_use]
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Override the method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Override the POST body.
    #[must_use]
    pub fn post_data(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.post_data = Some(body.into());
        self
    }

    /// Override the URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Release the request to the network.
    pub async fn send(self) -> Result<(), NetworkError> {
        self.route.handled.store(true, Ordering::SeqCst);
        self.route
            .session
            .send_command::<_, serde_json::Value>(
                "Fetch.continueRequest",
                Some(ContinueRequestParams {
                    request_id: self.route.request_id.clone(),
                    url: self.url,
                    method: self.method,
                    post_data: self
                        .post_data
                        .map(|b| base64::engine::general_purpose::STANDARD.encode(b)),
                    headers: self.headers.map(|headers| {
                        headers
                            .into_iter()
                            .map(|(name, value)| HeaderEntry { name, value })
                            .collect()
                    }),
                }),
            )
            .await?;
        Ok(())
    }
}

/// Route handler registry for one page session.
pub struct RouteRegistry {
    session: CdpSession,
    handlers: Arc<tokio::sync::RwLock<Vec<RegisteredRoute>>>,
    fetch_enabled: tokio::sync::RwLock<bool>,
    listener: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl std::fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRegistry")
            .field("session_id", &self.session.session_id())
            .finish_non_exhaustive()
    }
}

impl RouteRegistry {
    pub(crate) fn new(session: CdpSession) -> Arc<Self> {
        Arc::new(Self {
            session,
            handlers: Arc::new(tokio::sync::RwLock::new(Vec::new())),
            fetch_enabled: tokio::sync::RwLock::new(false),
            listener: parking_lot::Mutex::new(None),
        })
    }

    /// Register a handler; newest registrations match first.
    pub async fn route<H, Fut>(
        self: &Arc<Self>,
        pattern: impl Into<RoutePattern>,
        handler: H,
    ) -> Result<(), NetworkError>
    where
        H: Fn(Route) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), NetworkError>> + Send + 'static,
    {
        let handler: RouteHandlerFn = Arc::new(move |route| Box::pin(handler(route)));
        self.route_boxed(pattern.into(), handler).await
    }

    /// [`RouteRegistry::route`] with a shared handler, for contexts
    /// propagating one route across many pages.
    pub(crate) async fn route_boxed(
        self: &Arc<Self>,
        pattern: RoutePattern,
        handler: RouteHandlerFn,
    ) -> Result<(), NetworkError> {
        self.ensure_fetch_enabled().await?;
        self.ensure_listener();
        self.handlers
            .write()
            .await
            .push(RegisteredRoute { pattern, handler });
        Ok(())
    }

    /// Remove glob handlers registered with exactly this pattern.
    pub async fn unroute(&self, pattern: &str) -> Result<(), NetworkError> {
        let mut handlers = self.handlers.write().await;
        handlers.retain(
            |registered| !matches!(&registered.pattern, RoutePattern::Glob(p) if p == pattern),
        );
        let empty = handlers.is_empty();
        drop(handlers);
        if empty {
            self.disable_fetch().await?;
        }
        Ok(())
    }

    /// Remove every handler and stop intercepting.
    pub async fn unroute_all(&self) -> Result<(), NetworkError> {
        self.handlers.write().await.clear();
        self.disable_fetch().await
    }

    async fn ensure_fetch_enabled(&self) -> Result<(), NetworkError> {
        let mut enabled = self.fetch_enabled.write().await;
        if *enabled {
            return Ok(());
        }
        self.session
            .send_command::<_, serde_json::Value>(
                "Fetch.enable",
                Some(EnableParams {
                    patterns: Some(vec![RequestPattern {
                        url_pattern: Some("*".to_string()),
                        resource_type: None,
                        request_stage: None,
                    }]),
                }),
            )
            .await?;
        *enabled = true;
        Ok(())
    }

    async fn disable_fetch(&self) -> Result<(), NetworkError> {
        let mut enabled = self.fetch_enabled.write().await;
        if !*enabled {
            return Ok(());
        }
        self.session
            .send_command::<_, serde_json::Value>("Fetch.disable", None::<()>)
            .await?;
        *enabled = false;
        Ok(())
    }

    fn ensure_listener(self: &Arc<Self>) {
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return;
        }

        let mut events = self.session.subscribe_events();
        let session_id = self.session.session_id().to_string();
        let registry = Arc::downgrade(self);

        *listener = Some(tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                };
                if event.session_id.as_deref() != Some(&session_id)
                    || event.method != "Fetch.requestPaused"
                {
                    continue;
                }
                let Some(paused) = event.parse_params::<RequestPausedEvent>() else {
                    continue;
                };
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                if let Err(e) = registry.dispatch(&paused).await {
                    warn!(request_id = %paused.request_id, error = %e, "Route dispatch failed");
                }
            }
        }));
    }

    async fn dispatch(&self, paused: &RequestPausedEvent) -> Result<(), NetworkError> {
        let route = Route {
            session: self.session.clone(),
            request_id: paused.request_id.clone(),
            url: paused.request.url.clone(),
            method: paused.request.method.clone(),
            resource_type: paused.resource_type.clone(),
            handled: Arc::new(AtomicBool::new(false)),
        };

        let matching: Vec<RouteHandlerFn> = {
            let handlers = self.handlers.read().await;
            handlers
                .iter()
                .rev()
                .filter(|registered| registered.pattern.matches(&route.url))
                .map(|registered| registered.handler.clone())
                .collect()
        };

        for handler in matching {
            handler(route.clone()).await?;
            if route.is_handled() {
                return Ok(());
            }
            debug!(url = %route.url, "Handler declined, trying next");
        }

        // Unclaimed: continue to the network.
        route.continue_request().send().await
    }
}

impl Drop for RouteRegistry {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

impl Page {
    /// Intercept requests matching `pattern` with `handler`.
    ///
    /// ```no_run
    /// # use kestrel_core::page::Page;
    /// # async fn example(page: &Page) -> Result<(), kestrel_core::CoreError> {
    /// page.route("*/api/*", |route| async move {
    ///     route
    ///         .fulfill()
    ///         .status(200)
    ///         .content_type("application/json")
    ///         .body(r#"{"users": []}"#)
    ///         .send()
    ///         .await
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn route<H, Fut>(
        &self,
        pattern: impl Into<RoutePattern>,
        handler: H,
    ) -> Result<(), NetworkError>
    where
        H: Fn(Route) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), NetworkError>> + Send + 'static,
    {
        let registry = self.routes_registry().await?;
        registry.route(pattern, handler).await
    }

    /// Remove handlers registered with exactly `pattern`.
    pub async fn unroute(&self, pattern: &str) -> Result<(), NetworkError> {
        let registry = self.routes_registry().await?;
        registry.unroute(pattern).await
    }

    /// Register a pre-boxed handler; used by contexts to propagate one
    /// route to many pages.
    pub(crate) async fn route_boxed(
        &self,
        pattern: RoutePattern,
        handler: RouteHandlerFn,
    ) -> Result<(), NetworkError> {
        let registry = self.routes_registry().await?;
        registry.route_boxed(pattern, handler).await
    }

    /// Remove every route handler.
    pub async fn unroute_all(&self) -> Result<(), NetworkError> {
        let registry = self.routes_registry().await?;
        registry.unroute_all().await
    }

    async fn routes_registry(&self) -> Result<Arc<RouteRegistry>, NetworkError> {
        let session = self
            .session()
            .await
            .map_err(|e| NetworkError::PageUnavailable(e.to_string()))?;
        let mut routes = self.routes.lock().await;
        Ok(routes
            .get_or_insert_with(|| RouteRegistry::new(session))
            .clone())
    }
}
