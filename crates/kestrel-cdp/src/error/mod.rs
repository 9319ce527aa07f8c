//! Error types for the CDP client.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the CDP transport and session layer.
#[derive(Error, Debug)]
pub enum CdpError {
    /// The WebSocket connection attempt failed.
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    /// The WebSocket connection is gone. Every waiter outstanding at the
    /// moment the reader terminates resolves with this kind, and any
    /// later send fails with it without touching the wire.
    #[error("WebSocket connection lost")]
    ConnectionLost,

    /// A frame could not be handed to the write lane.
    #[error("failed to send CDP message: {0}")]
    SendFailed(String),

    /// The browser answered a command with an error object.
    #[error("CDP protocol error {code}: {message}")]
    Protocol {
        /// JSON-RPC style error code.
        code: i64,
        /// Human-readable message from the browser.
        message: String,
    },

    /// A command did not receive its reply within the deadline.
    #[error("response timeout after {0:?}")]
    Timeout(Duration),

    /// (De)serialization of a frame failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint URL could not be parsed or has the wrong scheme.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpointUrl(String),

    /// An HTTP request to the discovery side-channel failed.
    #[error("HTTP request failed: {0}")]
    HttpRequestFailed(String),

    /// The discovery endpoint never produced a usable WebSocket URL.
    #[error("endpoint discovery failed for {url}: {reason}")]
    EndpointDiscoveryFailed {
        /// The endpoint that was polled.
        url: String,
        /// Why discovery gave up.
        reason: String,
    },

    /// Discovery did not complete within the deadline.
    #[error("endpoint discovery timeout after {0:?}")]
    DiscoveryTimeout(Duration),

    /// A session id was used after detach, or never existed.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The target id is unknown to the browser.
    #[error("target not found: {0}")]
    TargetNotFound(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::ConnectionLost,
            other => Self::ConnectionFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests;
