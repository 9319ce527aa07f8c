//! CDP wire message types.
//!
//! Messages are UTF-8 JSON objects. A request carries a transport-unique
//! `id`; a reply echoes that `id` with exactly one of `result` or `error`;
//! an event carries a `method` and no `id`. All three optionally carry a
//! `sessionId` addressing a flat-mode session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An outgoing CDP command frame.
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    /// Monotonically increasing id, unique per connection.
    pub id: u64,
    /// Method name, e.g. `Target.createTarget`.
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Session to address; absent frames target the root browser session.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// A reply frame correlating to a previously sent request.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpReply {
    /// Id of the request this answers.
    pub id: u64,
    /// Payload on success.
    pub result: Option<Value>,
    /// Error on failure; exactly one of `result`/`error` is set.
    pub error: Option<CdpReplyError>,
    /// Session the reply belongs to, if any.
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Error object inside a reply frame.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpReplyError {
    /// JSON-RPC style code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional extra data.
    pub data: Option<Value>,
}

/// A server-pushed event frame.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpEvent {
    /// Event name, e.g. `Network.responseReceived`.
    pub method: String,
    /// Event payload.
    pub params: Option<Value>,
    /// Session the event originated from; absent for root-session events.
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

impl CdpEvent {
    /// Deserialize the payload into a typed event struct.
    ///
    /// Returns `None` when the payload is absent or does not match `T`.
    pub fn parse_params<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.params
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
    }
}

/// An inbound frame: either a reply or an event, distinguished by the
/// presence of `id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CdpMessage {
    /// A reply to a command we sent.
    Reply(CdpReply),
    /// An event pushed by the browser.
    Event(CdpEvent),
}

impl CdpMessage {
    /// Extract as a reply, if this is one.
    pub fn into_reply(self) -> Option<CdpReply> {
        match self {
            Self::Reply(reply) => Some(reply),
            Self::Event(_) => None,
        }
    }

    /// Extract as an event, if this is one.
    pub fn into_event(self) -> Option<CdpEvent> {
        match self {
            Self::Event(event) => Some(event),
            Self::Reply(_) => None,
        }
    }
}
