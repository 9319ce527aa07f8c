//! # Kestrel Core — dual-mode browser automation runtime
//!
//! High-level runtime for driving Chromium-class browsers over the
//! Chrome DevTools Protocol, with a dual-mode page engine that can
//! serve operations from either the rendered browser or a plain HTTP
//! client while keeping cookie state coherent between the two.
//!
//! ## Launching and driving a page
//!
//! ```no_run
//! use kestrel_core::{Browser, LoadState};
//!
//! # async fn example() -> Result<(), kestrel_core::CoreError> {
//! let browser = Browser::launcher().headless(true).launch().await?;
//! let page = browser.new_page().await?;
//!
//! page.goto("https://example.com")
//!     .wait_until(LoadState::Load)
//!     .goto()
//!     .await?;
//!
//! let title = page.title().await?;
//! println!("{title}");
//!
//! page.click("#submit", Default::default()).await?;
//! browser.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Observing network traffic
//!
//! ```no_run
//! use std::time::Duration;
//! use kestrel_core::network::NetworkFilter;
//!
//! # async fn example(page: &kestrel_core::page::Page) -> Result<(), kestrel_core::CoreError> {
//! let network = page.network().await?;
//!
//! let response = network
//!     .wait_for_response("*httpbin*", None, Duration::from_secs(10))
//!     .await?;
//! println!("{} {}", response.status, response.url);
//!
//! let api_entries = network.get_entries(Some(&NetworkFilter::api(None)), true);
//! # Ok(())
//! # }
//! ```
//!
//! ## Dual-mode operation
//!
//! ```no_run
//! use std::sync::Arc;
//! use kestrel_core::hybrid::{Hybrid, HybridConfig, HybridGoto};
//!
//! # async fn example(page: Arc<kestrel_core::page::Page>) -> Result<(), kestrel_core::CoreError> {
//! let hybrid = Hybrid::new(page, HybridConfig::default());
//!
//! // API-shaped URL: goes over plain HTTP.
//! hybrid.goto("https://example.com/api/items.json", HybridGoto::default()).await?;
//!
//! // Interaction: switches to the browser, syncing cookies first.
//! hybrid.click("#load-more").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Pooling browsers
//!
//! ```no_run
//! use kestrel_core::{Browser, BrowserPool};
//!
//! # async fn example() -> Result<(), kestrel_core::CoreError> {
//! let pool = BrowserPool::new(4, || Browser::launcher().headless(true));
//! let browser = pool.acquire(None).await?;
//! // ... use the browser ...
//! pool.release(browser).await;
//! pool.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module organization
//!
//! - [`browser`] — browser lifecycle: launch, connect, close
//! - [`context`] — isolation boundaries and their pages
//! - [`page`] — navigation, DOM, input, evaluation, interception
//! - [`target`] — target discovery and lifecycle events
//! - [`network`] — observation: filter, wait, stream, bodies
//! - [`cookies`] — the shared cookie model
//! - [`http`] — the session-mode HTTP client
//! - [`hybrid`] — the dual-mode engine
//! - [`pool`] — bounded browser pool
//! - [`profile`] — persistent profile directories
//! - [`wait`] — load states and lifecycle waits
//! - [`error`] — error types

pub mod browser;
pub mod context;
pub mod cookies;
pub mod error;
pub mod http;
pub mod hybrid;
pub mod network;
pub mod page;
pub mod pool;
pub mod profile;
pub mod target;
pub mod wait;

pub use browser::{Browser, BrowserBuilder, BrowserState, UserDataDir};
pub use context::{BrowserContext, ContextOptions, ContextOptionsBuilder, Geolocation};
pub use cookies::{CookiePriority, CookieRecord, CookieStore, SameSite};
pub use error::CoreError;
pub use http::{FingerprintProfile, HttpResponse, SessionClient};
pub use hybrid::{ActiveMode, Hybrid, HybridConfig, HybridGoto, HybridMode};
pub use network::{
    FilterCriteria, NetworkEntry, NetworkFilter, NetworkObserver, NetworkRequest, NetworkResponse,
    NetworkStream, ObserverConfig,
};
pub use page::{ElementHandle, ElementState, Page, Route};
pub use pool::BrowserPool;
pub use profile::{Profile, ProfileManager};
pub use target::{TargetEvent, TargetKind, TargetTracker};
pub use wait::LoadState;
