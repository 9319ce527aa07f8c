//! # Kestrel CDP — Chrome DevTools Protocol client
//!
//! Low-level CDP implementation over WebSocket: the transport layer the
//! Kestrel browser runtime is built on.
//!
//! This crate handles:
//! - WebSocket connection management to Chromium-class browsers
//! - Frame serialization and id→reply correlation for thousands of
//!   concurrent commands
//! - Event demultiplexing and subscription
//! - Flat-mode session management for pages, iframes, and workers
//! - Endpoint discovery through the `/json/version` side-channel
//!
//! ## Sending commands
//!
//! ```no_run
//! use kestrel_cdp::CdpConnection;
//! use kestrel_cdp::protocol::target_domain::{GetTargetsParams, GetTargetsResult};
//!
//! # async fn example() -> Result<(), kestrel_cdp::CdpError> {
//! let conn = CdpConnection::connect("ws://localhost:9222/devtools/browser/...").await?;
//!
//! let result: GetTargetsResult = conn
//!     .send_command("Target.getTargets", Some(GetTargetsParams::default()), None)
//!     .await?;
//! for target in result.target_infos {
//!     println!("{} {}", target.target_type, target.url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Sessions
//!
//! Flat-session mode makes every attached target a first-class endpoint
//! on the one connection:
//!
//! ```no_run
//! use std::sync::Arc;
//! use kestrel_cdp::{CdpConnection, SessionRouter};
//!
//! # async fn example() -> Result<(), kestrel_cdp::CdpError> {
//! let conn = Arc::new(CdpConnection::connect("ws://localhost:9222/...").await?);
//! let router = SessionRouter::new(conn);
//!
//! let session = router.attach("TARGET-ID").await?;
//! let _: serde_json::Value = session.send_command("Page.enable", None::<()>).await?;
//!
//! router.on(session.session_id(), "Page.loadEventFired", |event| {
//!     println!("loaded: {:?}", event.params);
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ## Discovery
//!
//! ```no_run
//! use kestrel_cdp::{poll_websocket_url, DiscoveryOptions};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), kestrel_cdp::CdpError> {
//! let options = DiscoveryOptions::new().timeout(Duration::from_secs(30));
//! let ws_url = poll_websocket_url("http://127.0.0.1:9222", &options).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module organization
//!
//! - [`connection`] — WebSocket connection, write lane, reply slots
//! - [`session`] — flat-mode sessions and event routing
//! - [`transport`] — wire message types
//! - [`protocol`] — typed CDP domain definitions
//! - [`error`] — error types

pub mod connection;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use connection::{
    discover_websocket_url, poll_websocket_url, BrowserVersionInfo, CdpConnection,
    DiscoveryOptions,
};
pub use error::CdpError;
pub use session::{CdpSession, HandlerId, SessionRouter};
pub use transport::{CdpEvent, CdpMessage, CdpReply, CdpRequest};
