//! Event-driven page tracking.
//!
//! This module is the single source of truth for page lifecycle in a
//! context. It consumes the tracker's target events so that every page
//! — created via `context.new_page()` or opened externally
//! (`window.open()`, `target="_blank"`, Ctrl+click) — is materialized
//! into the owning context's page set the same way:
//!
//! - `Created` materializes a page record (no session yet; it attaches
//!   lazily on first use, which also applies the context options)
//! - `Destroyed` marks the page closed and drops it from tracking
//! - `Crashed` flags the page so operations fail until a reload
//!
//! `new_page()` shares the registration path and simply triggers the
//! first use itself.

use std::sync::{Arc, Weak};

use kestrel_cdp::protocol::target_domain::TargetInfo;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::BrowserContext;
use crate::target::{TargetEvent, TargetKind};

/// Spawn the listener task for one context.
///
/// The task holds only a weak reference; it ends when the context is
/// dropped or closed, or when the tracker's event stream ends.
pub(crate) fn start_target_event_listener(context: &Arc<BrowserContext>) {
    let mut events = context.tracker().subscribe();
    let weak: Weak<BrowserContext> = Arc::downgrade(context);

    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    trace!(missed, "Target listener lagged behind event stream");
                    continue;
                }
            };
            let Some(context) = weak.upgrade() else {
                break;
            };
            if context.is_closed() {
                break;
            }

            match event {
                TargetEvent::Created(info) => handle_target_created(&context, &info).await,
                TargetEvent::Destroyed(target_id) => {
                    context.remove_page_target(&target_id).await;
                }
                TargetEvent::Crashed { target_id, status } => {
                    debug!(target_id = %target_id, status = %status, "Page target crashed");
                    context.crash_page_target(&target_id).await;
                }
                TargetEvent::InfoChanged(_) => {}
            }
        }
        debug!("Target listener ended");
    });
}

/// Whether a target belongs to the context identified by `context_id`.
///
/// The default context (`None`) matches targets that carry no context
/// id; named contexts require an exact match. An empty id on the wire
/// counts as absent.
pub(crate) fn target_matches_context(context_id: Option<&str>, info: &TargetInfo) -> bool {
    let target_context = info
        .browser_context_id
        .as_deref()
        .filter(|id| !id.is_empty());
    match context_id {
        None => target_context.is_none(),
        Some(id) => target_context == Some(id),
    }
}

/// Materialize a page record for a freshly discovered page target.
async fn handle_target_created(context: &Arc<BrowserContext>, info: &TargetInfo) {
    if TargetKind::parse(&info.target_type) != TargetKind::Page {
        trace!(
            target_type = %info.target_type,
            target_id = %info.target_id,
            "Ignoring non-page target"
        );
        return;
    }
    if !context.accepts_target(info) {
        trace!(
            target_context = ?info.browser_context_id,
            our_context = ?context.context_id(),
            target_id = %info.target_id,
            "Target belongs to a different context"
        );
        return;
    }

    debug!(
        target_id = %info.target_id,
        url = %info.url,
        opener_id = ?info.opener_id,
        "New page detected via target event"
    );
    context
        .register_page_target(&info.target_id, &info.url)
        .await;
}

#[cfg(test)]
mod tests;
