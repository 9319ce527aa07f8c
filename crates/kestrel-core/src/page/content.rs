//! Document content access.

use std::time::Duration;

use kestrel_cdp::protocol::page::SetDocumentContentParams;

use super::Page;
use crate::error::{NavigationError, PageError};
use crate::wait::{LifecycleWaiter, LoadState};

impl Page {
    /// The full serialized markup of the current document.
    pub async fn content(&self) -> Result<String, PageError> {
        let value = self
            .evaluate("document.documentElement.outerHTML")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// The document title.
    pub async fn title(&self) -> Result<String, PageError> {
        let value = self.evaluate("document.title").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// The live URL of the main frame.
    pub async fn url(&self) -> Result<String, PageError> {
        let value = self.evaluate("location.href").await?;
        let url = value.as_str().unwrap_or_default().to_string();
        self.set_url(url.clone());
        Ok(url)
    }

    /// Replace the document with `html` and wait for `wait_until`.
    pub async fn set_content(
        &self,
        html: impl Into<String>,
        wait_until: LoadState,
        timeout: Duration,
    ) -> Result<(), NavigationError> {
        let (session, frame_id) = self
            .session_and_frame()
            .await
            .map_err(NavigationError::from_page)?;

        let mut waiter = LifecycleWaiter::new(
            session.subscribe_events(),
            session.session_id(),
            frame_id.clone(),
        );
        session
            .send_command::<_, serde_json::Value>(
                "Page.setDocumentContent",
                Some(SetDocumentContentParams {
                    frame_id,
                    html: html.into(),
                }),
            )
            .await?;

        match waiter.wait_for_with_timeout(wait_until, timeout).await {
            Ok(()) => Ok(()),
            Err(crate::error::WaitError::Timeout(t)) => {
                Err(NavigationError::LifecycleTimeout {
                    state: wait_until.to_string(),
                    timeout: t,
                })
            }
            Err(other) => Err(NavigationError::Wait(other)),
        }
    }
}
