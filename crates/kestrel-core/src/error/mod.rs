//! Error types for the runtime.
//!
//! One enum per domain, all converging on [`CoreError`]. Operational
//! errors surface to the caller of the offending API and never tear down
//! the browser handle; only a lost transport cascades.

use std::time::Duration;

use thiserror::Error;

pub use kestrel_cdp::CdpError;

/// Umbrella error for the whole runtime.
#[derive(Error, Debug)]
pub enum CoreError {
    /// CDP transport or protocol error.
    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),

    /// Browser lifecycle error.
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Context error.
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// Page error.
    #[error("page error: {0}")]
    Page(#[from] PageError),

    /// Navigation error.
    #[error("navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Network observation error.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Wait error.
    #[error("wait error: {0}")]
    Wait(#[from] WaitError),

    /// Selector error.
    #[error("selector error: {0}")]
    Selector(#[from] SelectorError),

    /// Pool error.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Profile error.
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    /// HTTP session error.
    #[error("http error: {0}")]
    Http(#[from] HttpError),

    /// Dual-mode engine error.
    #[error("hybrid error: {0}")]
    Hybrid(#[from] HybridError),
}

/// Errors related to browser lifecycle.
#[derive(Error, Debug)]
pub enum BrowserError {
    /// No Chromium executable could be located.
    #[error("Chromium not found. Set CHROMIUM_PATH or install Chromium.")]
    ChromiumNotFound,

    /// The browser process failed to spawn.
    #[error("failed to launch browser: {0}")]
    LaunchFailed(String),

    /// The DevTools endpoint never became ready.
    #[error("browser launch timeout after {0:?}")]
    LaunchTimeout(Duration),

    /// Connecting to a running browser failed.
    #[error("failed to connect to browser: {0}")]
    ConnectionFailed(String),

    /// The handle is already closed.
    #[error("browser is closed")]
    Closed,

    /// CDP error during a browser operation.
    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),
}

/// Errors related to browsing contexts.
#[derive(Error, Debug)]
pub enum ContextError {
    /// The context is closed.
    #[error("context is closed")]
    Closed,

    /// Context creation failed.
    #[error("failed to create context: {0}")]
    CreateFailed(String),

    /// CDP error during a context operation.
    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),
}

/// Errors related to pages.
#[derive(Error, Debug)]
pub enum PageError {
    /// The page is closed.
    #[error("page is closed")]
    Closed,

    /// The page's renderer crashed; reload to recover.
    #[error("page crashed")]
    Crashed,

    /// Page creation failed.
    #[error("failed to create page: {0}")]
    CreateFailed(String),

    /// JavaScript evaluation threw.
    #[error("script error: {0}")]
    Script(String),

    /// No element matched the selector within the deadline.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The element never reached the requested visibility state.
    #[error("element not visible: {0}")]
    ElementNotVisible(String),

    /// The element has no layout box to interact with.
    #[error("element has no bounding box: {0}")]
    NoBoundingBox(String),

    /// CDP error during a page operation.
    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),

    /// Selector parse error.
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// Wait error during a page operation.
    #[error("wait error: {0}")]
    Wait(#[from] WaitError),
}

/// Classification of a failed navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationFailure {
    /// DNS resolution failed.
    Dns,
    /// Network-level failure (refused, reset, unreachable).
    Net,
    /// The navigation was aborted.
    Aborted,
    /// TLS/certificate failure.
    Ssl,
    /// Anything else.
    Other,
}

/// Errors related to navigation.
#[derive(Error, Debug)]
pub enum NavigationError {
    /// The browser reported a navigation failure.
    #[error("navigation to {url} failed ({kind:?}): {error_text}")]
    Failed {
        /// Failure classification.
        kind: NavigationFailure,
        /// The URL that failed.
        url: String,
        /// Raw browser error text, e.g. `net::ERR_NAME_NOT_RESOLVED`.
        error_text: String,
    },

    /// The requested lifecycle state was not reached in time.
    #[error("lifecycle timeout waiting for {state} after {timeout:?}")]
    LifecycleTimeout {
        /// The state that was awaited.
        state: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// CDP error during navigation.
    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),

    /// Wait error during navigation.
    #[error("wait error: {0}")]
    Wait(#[from] WaitError),
}

impl NavigationError {
    /// Classify a Chromium `net::` error string into a failure kind.
    pub fn classify(error_text: &str) -> NavigationFailure {
        if error_text.contains("ERR_NAME_NOT_RESOLVED")
            || error_text.contains("ERR_NAME_RESOLUTION_FAILED")
            || error_text.contains("ERR_DNS_")
        {
            NavigationFailure::Dns
        } else if error_text.contains("ERR_CERT_") || error_text.contains("ERR_SSL_") {
            NavigationFailure::Ssl
        } else if error_text.contains("ERR_ABORTED") {
            NavigationFailure::Aborted
        } else if error_text.contains("ERR_CONNECTION_")
            || error_text.contains("ERR_INTERNET_DISCONNECTED")
            || error_text.contains("ERR_ADDRESS_UNREACHABLE")
            || error_text.contains("ERR_NETWORK_")
        {
            NavigationFailure::Net
        } else {
            NavigationFailure::Other
        }
    }

    /// Build a `Failed` error from the browser's error text.
    pub fn from_error_text(url: impl Into<String>, error_text: impl Into<String>) -> Self {
        let error_text = error_text.into();
        Self::Failed {
            kind: Self::classify(&error_text),
            url: url.into(),
            error_text,
        }
    }
}

/// Errors related to network observation.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// A wait did not match before its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The event stream ended while waiting.
    #[error("event stream aborted")]
    Aborted,

    /// The awaited entry was evicted from the ring (opt-in failure).
    #[error("network entry evicted: {0}")]
    EntryEvicted(String),

    /// The observer is not started.
    #[error("network observer not started")]
    NotStarted,

    /// The owning page cannot accept operations.
    #[error("page unavailable: {0}")]
    PageUnavailable(String),

    /// CDP error during a network operation.
    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),
}

/// Errors related to waits.
#[derive(Error, Debug)]
pub enum WaitError {
    /// The wait timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The page went away during the wait.
    #[error("page closed during wait")]
    PageClosed,
}

/// Errors related to selector parsing.
#[derive(Error, Debug)]
pub enum SelectorError {
    /// Empty selector string.
    #[error("empty selector")]
    Empty,

    /// Unparseable selector.
    #[error("invalid selector {selector:?}: {reason}")]
    Invalid {
        /// The offending input.
        selector: String,
        /// What went wrong.
        reason: String,
    },
}

/// Errors related to the browser pool.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The pool refuses further acquisitions.
    #[error("pool is closed")]
    Closed,

    /// No handle became available before the deadline.
    #[error("pool acquire timeout after {0:?}")]
    Timeout(Duration),

    /// Creating a new pooled browser failed.
    #[error("failed to create pooled browser: {0}")]
    CreateFailed(String),
}

/// Errors related to persistent profiles.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The profile directory does not exist.
    #[error("profile missing: {0}")]
    Missing(String),

    /// Another live process holds the profile lock.
    #[error("profile locked by pid {pid}")]
    Locked {
        /// Owner of the lock.
        pid: u32,
    },

    /// Filesystem error.
    #[error("profile io error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata (de)serialization error.
    #[error("profile metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Errors from the session-mode HTTP client.
#[derive(Error, Debug)]
pub enum HttpError {
    /// The request failed at the transport level.
    #[error("request failed: {0}")]
    Request(String),

    /// The request timed out.
    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    /// The URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Body decoding failed.
    #[error("body decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured duration here.
            Self::Timeout(Duration::ZERO)
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Errors from the dual-mode engine.
#[derive(Error, Debug)]
pub enum HybridError {
    /// The operation needs browser mode but none is available.
    #[error("operation {0:?} requires browser mode")]
    BrowserRequired(String),

    /// Browser-path failure.
    #[error(transparent)]
    Page(#[from] PageError),

    /// Browser-path navigation failure.
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// HTTP-path failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// CDP failure during cookie sync.
    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),
}

#[cfg(test)]
mod tests;
