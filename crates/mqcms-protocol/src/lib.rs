//! Wire types for the mqcms realtime broadcast channel.
//!
//! Every message a display client receives is a JSON text frame. Server-built
//! messages are [`Envelope`]s tagged with a [`MessageKind`]; JSON objects a
//! client sends are relayed verbatim as a [`RelayedMessage`] with the hub's
//! timestamp and connection count stamped on.
//!
//! ```text
//! client frame ──► ClientFrame::interpret ──► ClientPayload ──► BroadcastMessage ──► peers
//!                          │
//!                          └── FrameError ──► Envelope(error) ──► sender only
//! ```

pub mod envelope;
pub mod frame;
pub mod relay;
pub mod timestamp;

pub use envelope::{Envelope, MessageKind, UnknownKind};
pub use frame::{ClientFrame, ClientPayload, FrameError};
pub use relay::RelayedMessage;

use serde::Serialize;

/// A message fanned out to the connections of a hub.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BroadcastMessage {
    /// A server-built envelope.
    Typed(Envelope),
    /// A client-supplied JSON object.
    Relayed(RelayedMessage),
}

impl BroadcastMessage {
    /// Serialize to the JSON text carried in a websocket frame.
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// The `type` tag a receiver will see, if any.
    pub fn type_tag(&self) -> Option<&str> {
        match self {
            BroadcastMessage::Typed(envelope) => Some(envelope.kind.as_str()),
            BroadcastMessage::Relayed(relayed) => relayed.declared_type(),
        }
    }
}

impl From<Envelope> for BroadcastMessage {
    fn from(envelope: Envelope) -> Self {
        BroadcastMessage::Typed(envelope)
    }
}

impl From<RelayedMessage> for BroadcastMessage {
    fn from(relayed: RelayedMessage) -> Self {
        BroadcastMessage::Relayed(relayed)
    }
}
