//! Navigation: goto, reload, and history traversal.

use std::time::Duration;

use kestrel_cdp::protocol::page::{
    GetNavigationHistoryResult, NavigateParams, NavigateResult, NavigateToHistoryEntryParams,
    ReloadParams,
};
use tracing::{debug, instrument};

use super::Page;
use crate::error::{NavigationError, WaitError};
use crate::wait::{LifecycleWaiter, LoadState};

/// Default deadline for navigations.
const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Which history direction a traversal takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateKind {
    /// One entry backwards.
    Back,
    /// One entry forwards.
    Forward,
}

/// Builder for [`Page::goto`].
#[derive(Debug)]
pub struct GotoBuilder<'a> {
    page: &'a Page,
    url: String,
    wait_until: LoadState,
    referer: Option<String>,
    timeout: Duration,
}

impl<'a> GotoBuilder<'a> {
    pub(crate) fn new(page: &'a Page, url: impl Into<String>) -> Self {
        Self {
            page,
            url: url.into(),
            wait_until: LoadState::Load,
            referer: None,
            timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }

    /// Lifecycle state to wait for; defaults to `load`.
    #[must_use]
    pub fn wait_until(mut self, state: LoadState) -> Self {
        self.wait_until = state;
        self
    }

    /// Referer header for the navigation request.
    #[must_use]
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Overall deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Perform the navigation.
    ///
    /// On success the page's cached URL is updated; on failure it is
    /// left unchanged.
    ///
    /// # Errors
    ///
    /// `Failed` when the browser reports a network-level error,
    /// `LifecycleTimeout` when the requested state is not reached in
    /// time.
    #[instrument(level = "debug", skip(self), fields(url = %self.url, wait_until = %self.wait_until))]
    pub async fn goto(self) -> Result<(), NavigationError> {
        let (session, frame_id) = self
            .page
            .session_and_frame()
            .await
            .map_err(NavigationError::from_page)?;

        // Subscribe before navigating so no lifecycle event is missed.
        let mut waiter =
            LifecycleWaiter::new(session.subscribe_events(), session.session_id(), frame_id);

        let result: NavigateResult = session
            .send_command(
                "Page.navigate",
                Some(NavigateParams {
                    url: self.url.clone(),
                    referrer: self.referer.clone(),
                    transition_type: None,
                    frame_id: None,
                }),
            )
            .await?;

        if let Some(error_text) = result.error_text {
            debug!(error_text = %error_text, "Navigation failed at the network layer");
            return Err(NavigationError::from_error_text(self.url, error_text));
        }

        wait_for_state(&mut waiter, self.wait_until, self.timeout).await?;
        self.page.set_url(self.url);
        self.page.set_state(super::PageState::Loaded);
        Ok(())
    }
}

async fn wait_for_state(
    waiter: &mut LifecycleWaiter,
    target: LoadState,
    timeout: Duration,
) -> Result<(), NavigationError> {
    match waiter.wait_for_with_timeout(target, timeout).await {
        Ok(()) => Ok(()),
        Err(WaitError::Timeout(t)) => Err(NavigationError::LifecycleTimeout {
            state: target.to_string(),
            timeout: t,
        }),
        Err(other) => Err(NavigationError::Wait(other)),
    }
}

impl Page {
    /// Navigate the main frame to `url`.
    ///
    /// ```no_run
    /// # use kestrel_core::page::Page;
    /// # use kestrel_core::wait::LoadState;
    /// # async fn example(page: &Page) -> Result<(), kestrel_core::CoreError> {
    /// page.goto("https://example.com")
    ///     .wait_until(LoadState::NetworkIdle)
    ///     .goto()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn goto(&self, url: impl Into<String>) -> GotoBuilder<'_> {
        GotoBuilder::new(self, url)
    }

    /// Reload the current document and wait for `wait_until`.
    pub async fn reload(
        &self,
        wait_until: LoadState,
        timeout: Duration,
    ) -> Result<(), NavigationError> {
        let (session, frame_id) = self
            .session_and_frame()
            .await
            .map_err(NavigationError::from_page)?;

        let mut waiter =
            LifecycleWaiter::new(session.subscribe_events(), session.session_id(), frame_id);
        session
            .send_command::<_, serde_json::Value>("Page.reload", Some(ReloadParams::default()))
            .await?;
        // A reload recovers a crashed renderer.
        self.set_state(super::PageState::Loading);
        wait_for_state(&mut waiter, wait_until, timeout).await?;
        self.set_state(super::PageState::Loaded);
        Ok(())
    }

    /// Go one entry back in the session history.
    pub async fn go_back(
        &self,
        wait_until: LoadState,
        timeout: Duration,
    ) -> Result<(), NavigationError> {
        self.traverse_history(NavigateKind::Back, wait_until, timeout)
            .await
    }

    /// Go one entry forward in the session history.
    pub async fn go_forward(
        &self,
        wait_until: LoadState,
        timeout: Duration,
    ) -> Result<(), NavigationError> {
        self.traverse_history(NavigateKind::Forward, wait_until, timeout)
            .await
    }

    async fn traverse_history(
        &self,
        kind: NavigateKind,
        wait_until: LoadState,
        timeout: Duration,
    ) -> Result<(), NavigationError> {
        let (session, frame_id) = self
            .session_and_frame()
            .await
            .map_err(NavigationError::from_page)?;

        let history: GetNavigationHistoryResult = session
            .send_command("Page.getNavigationHistory", None::<()>)
            .await?;

        let target_index = match kind {
            NavigateKind::Back => history.current_index - 1,
            NavigateKind::Forward => history.current_index + 1,
        };
        let Some(entry) = usize::try_from(target_index)
            .ok()
            .and_then(|i| history.entries.get(i))
        else {
            // Nothing to traverse to; a no-op, like the browser buttons.
            return Ok(());
        };

        let mut waiter =
            LifecycleWaiter::new(session.subscribe_events(), session.session_id(), frame_id);
        let url = entry.url.clone();
        session
            .send_command::<_, serde_json::Value>(
                "Page.navigateToHistoryEntry",
                Some(NavigateToHistoryEntryParams { entry_id: entry.id }),
            )
            .await?;
        wait_for_state(&mut waiter, wait_until, timeout).await?;
        self.set_url(url);
        Ok(())
    }

    /// Wait for the main frame to reach `state`.
    pub async fn wait_for_load_state(
        &self,
        state: LoadState,
        timeout: Duration,
    ) -> Result<(), NavigationError> {
        let (session, frame_id) = self
            .session_and_frame()
            .await
            .map_err(NavigationError::from_page)?;
        // Seed from the page's coarse state so an already-loaded page
        // does not wait for a load event that fired long ago. NetworkIdle
        // still has to observe the quiet window.
        if self.state() == super::PageState::Loaded && state <= LoadState::Load {
            return Ok(());
        }
        let mut waiter =
            LifecycleWaiter::new(session.subscribe_events(), session.session_id(), frame_id);
        wait_for_state(&mut waiter, state, timeout).await
    }
}

impl NavigationError {
    pub(crate) fn from_page(err: crate::error::PageError) -> Self {
        Self::Failed {
            kind: crate::error::NavigationFailure::Other,
            url: String::new(),
            error_text: err.to_string(),
        }
    }
}
