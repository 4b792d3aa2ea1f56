//! Inbound client frames and how they are interpreted.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::envelope::Envelope;
use crate::relay::RelayedMessage;
use crate::BroadcastMessage;

/// A data frame received from a connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Why a client frame was not relayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
}

/// The relayable content of an accepted frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPayload {
    /// A JSON object, forwarded field for field.
    Object(Map<String, Value>),
    /// Text that is not a JSON object, including valid non-object JSON.
    Text(String),
    /// A binary frame; only its length is kept.
    Binary(usize),
}

impl ClientFrame {
    pub fn len(&self) -> usize {
        match self {
            ClientFrame::Text(text) => text.len(),
            ClientFrame::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classify the frame. Only text over `max_text_bytes` is rejected; any
    /// JSON object is relayed whatever its `type`.
    pub fn interpret(self, max_text_bytes: usize) -> Result<ClientPayload, FrameError> {
        let text = match self {
            ClientFrame::Binary(data) => return Ok(ClientPayload::Binary(data.len())),
            ClientFrame::Text(text) => text,
        };

        if text.len() > max_text_bytes {
            return Err(FrameError::TooLarge {
                size: text.len(),
                limit: max_text_bytes,
            });
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(fields)) => Ok(ClientPayload::Object(fields)),
            _ => Ok(ClientPayload::Text(text)),
        }
    }
}

impl ClientPayload {
    /// Build the message peers receive, stamped with the hub's current size.
    pub fn into_message(self, connection_count: usize) -> BroadcastMessage {
        match self {
            ClientPayload::Object(fields) => RelayedMessage::new(fields, connection_count).into(),
            ClientPayload::Text(text) => Envelope::text(text, connection_count).into(),
            ClientPayload::Binary(_) => Envelope::binary(connection_count).into(),
        }
    }
}
