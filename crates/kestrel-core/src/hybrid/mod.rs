//! Dual-mode page engine.
//!
//! A [`Hybrid`] fronts one browser page and one HTTP session client
//! behind a single surface, routing each operation to whichever side
//! fits: interactive operations always need the browser, API-shaped
//! URLs prefer plain HTTP, and everything else follows the configured
//! bias. Cookie state stays coherent through a shared [`CookieStore`]
//! and a dirty flag that records which side last wrote cookies; before
//! an operation crosses to the other side, the dirty side is pulled
//! into the store and the store pushed into the clean side.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use kestrel_cdp::protocol::network::{GetCookiesParams, GetCookiesResult};
use kestrel_cdp::protocol::storage::{ClearCookiesParams, SetCookiesParams};
use serde_json::Value;
use tracing::{debug, instrument, trace};
use url::Url;

use crate::cookies::{CookieRecord, CookieStore};
use crate::error::HybridError;
use crate::http::{HttpResponse, SessionClient};
use crate::page::input::ClickOptions;
use crate::page::{ElementHandle, ElementState, Page};
use crate::wait::LoadState;

/// Global mode setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HybridMode {
    /// Pick per operation.
    #[default]
    Auto,
    /// Always the browser path.
    Browser,
    /// Always the HTTP path (interactive operations still fail over to
    /// the browser).
    Session,
}

/// Which side is currently driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveMode {
    /// The CDP-driven page.
    Browser,
    /// The HTTP client.
    Session,
}

/// Operation kinds for mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Navigation.
    Navigate,
    /// Reading page content.
    Content,
    /// DOM query.
    Query,
    /// Click, fill, type, and friends.
    Interact,
    /// JavaScript evaluation.
    Evaluate,
    /// Script/function/route installation.
    Instrument,
    /// Explicit HTTP fetch.
    Fetch,
}

impl Operation {
    /// Whether this operation can only run on the browser side.
    pub fn requires_browser(self) -> bool {
        matches!(self, Self::Interact | Self::Evaluate | Self::Instrument)
    }
}

/// Tunables for the dual-mode engine.
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Global mode.
    pub mode: HybridMode,
    /// Bias navigations toward the HTTP path.
    pub prefer_session: bool,
    /// Keep cookies coherent automatically.
    pub auto_sync_cookies: bool,
    /// URL substrings that force the browser path.
    pub browser_required_patterns: Vec<String>,
    /// URL substrings that prefer the HTTP path.
    pub session_preferred_patterns: Vec<String>,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            mode: HybridMode::Auto,
            prefer_session: true,
            auto_sync_cookies: true,
            browser_required_patterns: Vec::new(),
            session_preferred_patterns: vec![
                "/api/".to_string(),
                ".json".to_string(),
                ".xml".to_string(),
                "/graphql".to_string(),
            ],
        }
    }
}

/// Decide whether `operation` on `url` takes the browser path.
///
/// Evaluation order: global mode, operation kind, browser-required
/// patterns, session-preferred patterns, then the navigation bias.
pub fn should_use_browser(config: &HybridConfig, url: &str, operation: Operation) -> bool {
    match config.mode {
        HybridMode::Browser => return true,
        HybridMode::Session if !operation.requires_browser() => return false,
        _ => {}
    }

    if operation.requires_browser() {
        return true;
    }
    if operation == Operation::Fetch {
        return false;
    }

    if config
        .browser_required_patterns
        .iter()
        .any(|pattern| url.contains(pattern))
    {
        return true;
    }

    if config.prefer_session
        && config
            .session_preferred_patterns
            .iter()
            .any(|pattern| url.contains(pattern))
    {
        return false;
    }

    if operation == Operation::Navigate {
        return !config.prefer_session;
    }
    true
}

/// Options for [`Hybrid::goto`].
#[derive(Debug, Clone)]
pub struct HybridGoto {
    /// Lifecycle state to wait for on the browser path.
    pub wait_until: LoadState,
    /// Deadline.
    pub timeout: Duration,
    /// Referer header.
    pub referer: Option<String>,
    /// Explicit mode override; wins over every other rule.
    pub use_browser: Option<bool>,
}

impl Default for HybridGoto {
    fn default() -> Self {
        Self {
            wait_until: LoadState::Load,
            timeout: Duration::from_secs(30),
            referer: None,
            use_browser: None,
        }
    }
}

/// One dual-mode page.
pub struct Hybrid {
    page: Arc<Page>,
    client: SessionClient,
    store: Arc<CookieStore>,
    config: parking_lot::RwLock<HybridConfig>,
    active: parking_lot::RwLock<Option<ActiveMode>>,
    /// Which side last mutated cookies; `None` means coherent.
    dirty: parking_lot::RwLock<Option<ActiveMode>>,
    url: parking_lot::RwLock<String>,
    last_browser_url: parking_lot::RwLock<String>,
    last_response: parking_lot::RwLock<Option<HttpResponse>>,
    /// Session-mode navigation history: entries and current index.
    session_history: parking_lot::RwLock<(Vec<String>, usize)>,
}

impl std::fmt::Debug for Hybrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hybrid")
            .field("active", &*self.active.read())
            .field("url", &*self.url.read())
            .finish_non_exhaustive()
    }
}

impl Hybrid {
    /// Pair `page` with a fresh HTTP client under `config`.
    pub fn new(page: Arc<Page>, config: HybridConfig) -> Self {
        Self::with_client(page, SessionClient::new(), config)
    }

    /// Pair `page` with an existing HTTP client.
    pub fn with_client(page: Arc<Page>, client: SessionClient, config: HybridConfig) -> Self {
        Self {
            page,
            client,
            store: Arc::new(CookieStore::new()),
            config: parking_lot::RwLock::new(config),
            active: parking_lot::RwLock::new(None),
            dirty: parking_lot::RwLock::new(None),
            url: parking_lot::RwLock::new(String::new()),
            last_browser_url: parking_lot::RwLock::new(String::new()),
            last_response: parking_lot::RwLock::new(None),
            session_history: parking_lot::RwLock::new((Vec::new(), 0)),
        }
    }

    /// The browser-side page.
    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    /// The HTTP-side client.
    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// The shared cookie store.
    pub fn cookie_store(&self) -> &Arc<CookieStore> {
        &self.store
    }

    /// The side currently driving, if any operation ran yet.
    pub fn active_mode(&self) -> Option<ActiveMode> {
        *self.active.read()
    }

    /// The current URL.
    pub fn current_url(&self) -> String {
        self.url.read().clone()
    }

    /// Replace the global mode.
    pub fn set_mode(&self, mode: HybridMode) {
        self.config.write().mode = mode;
    }

    /// Add a URL substring that forces the browser path.
    pub fn add_browser_required_pattern(&self, pattern: impl Into<String>) {
        self.config
            .write()
            .browser_required_patterns
            .push(pattern.into());
    }

    /// Add a URL substring that prefers the HTTP path.
    pub fn add_session_preferred_pattern(&self, pattern: impl Into<String>) {
        self.config
            .write()
            .session_preferred_patterns
            .push(pattern.into());
    }

    fn mark_dirty(&self, side: ActiveMode) {
        *self.dirty.write() = Some(side);
    }

    /// Pull cookies from the browser into the shared store.
    async fn pull_browser_cookies(&self) -> Result<(), HybridError> {
        let session = self.page.session().await?;
        let result: GetCookiesResult = session
            .send_command("Network.getCookies", Some(GetCookiesParams::default()))
            .await?;
        self.store
            .update_from_list(result.cookies.into_iter().map(CookieRecord::from));
        Ok(())
    }

    /// Push the shared store into the browser.
    async fn push_browser_cookies(&self) -> Result<(), HybridError> {
        let records = self.store.get_all();
        if records.is_empty() {
            return Ok(());
        }
        let session = self.page.session().await?;
        session
            .connection()
            .send_command::<_, serde_json::Value>(
                "Storage.setCookies",
                Some(SetCookiesParams {
                    cookies: records.iter().map(CookieRecord::to_cdp_param).collect(),
                    browser_context_id: self.page.context_id().map(str::to_string),
                }),
                None,
            )
            .await?;
        Ok(())
    }

    fn pull_session_cookies(&self) {
        self.store.update_from_list(self.client.jar().get_all());
    }

    fn push_session_cookies(&self) {
        self.client.jar().update_from_list(self.store.get_all());
    }

    /// Make `target` cookie-coherent if the other side is dirty.
    async fn sync_cookies_if_needed(&self, target: ActiveMode) -> Result<(), HybridError> {
        if !self.config.read().auto_sync_cookies {
            return Ok(());
        }
        let dirty = *self.dirty.read();
        let Some(dirty) = dirty else {
            return Ok(());
        };
        if dirty == target {
            return Ok(());
        }

        trace!(?dirty, ?target, "Syncing cookies across modes");
        match dirty {
            ActiveMode::Browser => {
                self.pull_browser_cookies().await?;
                self.push_session_cookies();
            }
            ActiveMode::Session => {
                self.pull_session_cookies();
                self.push_browser_cookies().await?;
            }
        }
        *self.dirty.write() = None;
        Ok(())
    }

    /// Force a full cookie round-trip: both sides pulled into the
    /// store, the store pushed into both sides.
    #[instrument(level = "debug", skip(self))]
    pub async fn sync_cookies(&self) -> Result<(), HybridError> {
        self.pull_browser_cookies().await?;
        self.pull_session_cookies();
        self.push_session_cookies();
        self.push_browser_cookies().await?;
        *self.dirty.write() = None;
        Ok(())
    }

    /// Clear cookies on both sides and in the store.
    pub async fn clear_cookies(&self) -> Result<(), HybridError> {
        let session = self.page.session().await?;
        session
            .connection()
            .send_command::<_, serde_json::Value>(
                "Storage.clearCookies",
                Some(ClearCookiesParams {
                    browser_context_id: self.page.context_id().map(str::to_string),
                }),
                None,
            )
            .await?;
        self.client.clear_cookies();
        self.store.clear(None);
        *self.dirty.write() = None;
        Ok(())
    }

    async fn switch_to_browser(&self) -> Result<(), HybridError> {
        self.sync_cookies_if_needed(ActiveMode::Browser).await?;

        let url = self.url.read().clone();
        if !url.is_empty() && url != *self.last_browser_url.read() {
            debug!(url = %url, "Bringing browser to the session's URL");
            self.page.goto(url.clone()).goto().await?;
            *self.last_browser_url.write() = url;
        }
        *self.active.write() = Some(ActiveMode::Browser);
        Ok(())
    }

    async fn switch_to_session(&self) -> Result<(), HybridError> {
        self.sync_cookies_if_needed(ActiveMode::Session).await?;
        *self.active.write() = Some(ActiveMode::Session);
        Ok(())
    }

    /// Navigate, choosing the path per configuration.
    ///
    /// Returns the HTTP response on the session path, `None` on the
    /// browser path.
    #[instrument(level = "debug", skip(self, options), fields(url = %url))]
    pub async fn goto(
        &self,
        url: &str,
        options: HybridGoto,
    ) -> Result<Option<HttpResponse>, HybridError> {
        let use_browser = options.use_browser.unwrap_or_else(|| {
            should_use_browser(&self.config.read(), url, Operation::Navigate)
        });

        *self.url.write() = url.to_string();

        if use_browser {
            self.switch_to_browser_for_url(url).await?;
            let mut goto = self
                .page
                .goto(url)
                .wait_until(options.wait_until)
                .timeout(options.timeout);
            if let Some(referer) = &options.referer {
                goto = goto.referer(referer.clone());
            }
            goto.goto().await?;
            *self.last_browser_url.write() = url.to_string();
            self.mark_dirty(ActiveMode::Browser);
            Ok(None)
        } else {
            self.switch_to_session().await?;
            let mut request = self.client.get(url).timeout(options.timeout);
            if let Some(referer) = &options.referer {
                request = request.header("Referer", referer.clone());
            }
            let response = request.send().await?;

            {
                let mut history = self.session_history.write();
                let index = history.1;
                let new_len = index.saturating_add(1).min(history.0.len());
                history.0.truncate(new_len);
                history.0.push(url.to_string());
                history.1 = history.0.len() - 1;
            }
            *self.last_response.write() = Some(response.clone());
            self.mark_dirty(ActiveMode::Session);
            Ok(Some(response))
        }
    }

    /// Like [`Hybrid::switch_to_browser`] but without re-navigating to
    /// the stored URL (the caller is about to navigate anyway).
    async fn switch_to_browser_for_url(&self, _url: &str) -> Result<(), HybridError> {
        self.sync_cookies_if_needed(ActiveMode::Browser).await?;
        *self.active.write() = Some(ActiveMode::Browser);
        Ok(())
    }

    /// Fetch over HTTP regardless of mode, pre-syncing browser cookies
    /// when they are dirty.
    #[instrument(level = "debug", skip(self), fields(method = %method, url = %url))]
    pub async fn fetch(
        &self,
        method: &str,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<Value>,
    ) -> Result<HttpResponse, HybridError> {
        if *self.dirty.read() == Some(ActiveMode::Browser) {
            self.sync_cookies_if_needed(ActiveMode::Session).await?;
        }

        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }
        let response = request.send().await?;
        self.mark_dirty(ActiveMode::Session);
        Ok(response)
    }

    /// Current document markup, from whichever side is active.
    pub async fn content(&self) -> Result<String, HybridError> {
        match self.active_mode() {
            Some(ActiveMode::Session) => Ok(self
                .last_response
                .read()
                .as_ref()
                .map(HttpResponse::text)
                .unwrap_or_default()),
            _ => Ok(self.page.content().await?),
        }
    }

    /// Current document title.
    pub async fn title(&self) -> Result<String, HybridError> {
        match self.active_mode() {
            Some(ActiveMode::Session) => Ok(self
                .last_response
                .read()
                .as_ref()
                .and_then(HttpResponse::title)
                .unwrap_or_default()),
            _ => Ok(self.page.title().await?),
        }
    }

    /// Reload the current document on the active side.
    pub async fn reload(&self) -> Result<Option<HttpResponse>, HybridError> {
        match self.active_mode() {
            Some(ActiveMode::Session) => {
                let url = self.url.read().clone();
                let response = self.client.get(url).send().await?;
                *self.last_response.write() = Some(response.clone());
                self.mark_dirty(ActiveMode::Session);
                Ok(Some(response))
            }
            _ => {
                self.page
                    .reload(LoadState::Load, Duration::from_secs(30))
                    .await?;
                self.mark_dirty(ActiveMode::Browser);
                Ok(None)
            }
        }
    }

    /// Go back one entry on the active side.
    pub async fn go_back(&self) -> Result<Option<HttpResponse>, HybridError> {
        match self.active_mode() {
            Some(ActiveMode::Session) => self.traverse_session_history(-1).await,
            _ => {
                self.page
                    .go_back(LoadState::Load, Duration::from_secs(30))
                    .await?;
                Ok(None)
            }
        }
    }

    /// Go forward one entry on the active side.
    pub async fn go_forward(&self) -> Result<Option<HttpResponse>, HybridError> {
        match self.active_mode() {
            Some(ActiveMode::Session) => self.traverse_session_history(1).await,
            _ => {
                self.page
                    .go_forward(LoadState::Load, Duration::from_secs(30))
                    .await?;
                Ok(None)
            }
        }
    }

    async fn traverse_session_history(
        &self,
        delta: i64,
    ) -> Result<Option<HttpResponse>, HybridError> {
        let target = {
            let history = self.session_history.read();
            let next = history.1 as i64 + delta;
            if next < 0 || next as usize >= history.0.len() {
                return Ok(None);
            }
            (next as usize, history.0[next as usize].clone())
        };

        let response = self.client.get(target.1.clone()).send().await?;
        self.session_history.write().1 = target.0;
        *self.url.write() = target.1;
        *self.last_response.write() = Some(response.clone());
        self.mark_dirty(ActiveMode::Session);
        Ok(Some(response))
    }

    /// Click (browser path; switches if needed).
    pub async fn click(&self, selector: &str) -> Result<(), HybridError> {
        self.switch_to_browser().await?;
        self.page.click(selector, ClickOptions::default()).await?;
        self.mark_dirty(ActiveMode::Browser);
        Ok(())
    }

    /// Fill an input (browser path).
    pub async fn fill(&self, selector: &str, value: &str) -> Result<(), HybridError> {
        self.switch_to_browser().await?;
        self.page.fill(selector, value).await?;
        self.mark_dirty(ActiveMode::Browser);
        Ok(())
    }

    /// Type text (browser path).
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<(), HybridError> {
        self.switch_to_browser().await?;
        self.page
            .type_text(selector, text, Duration::ZERO)
            .await?;
        self.mark_dirty(ActiveMode::Browser);
        Ok(())
    }

    /// Evaluate JavaScript (browser path).
    pub async fn evaluate(&self, expression: &str) -> Result<Value, HybridError> {
        self.switch_to_browser().await?;
        let value = self.page.evaluate(expression).await?;
        self.mark_dirty(ActiveMode::Browser);
        Ok(value)
    }

    /// Query an element (browser path; session-mode querying would need
    /// a DOM, which the HTTP side does not have).
    pub async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, HybridError> {
        self.switch_to_browser().await?;
        Ok(self.page.query(selector).await?)
    }

    /// Wait for a selector (browser path).
    pub async fn wait_for_selector(
        &self,
        selector: &str,
        state: ElementState,
        deadline: Duration,
    ) -> Result<Option<ElementHandle>, HybridError> {
        self.switch_to_browser().await?;
        Ok(self.page.wait_for_selector(selector, state, deadline).await?)
    }

    /// The host of the current URL, for cookie scoping.
    pub fn current_host(&self) -> Option<String> {
        Url::parse(&self.url.read())
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests;
