//! Server-built messages.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Message kinds
// ============================================================================

/// The `type` tag of a server-built message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    // ===== Membership =====
    /// Sent privately to a connection right after it is accepted.
    Welcome,
    UserJoined,
    UserLeft,
    UserError,

    // ===== Relay =====
    /// Non-object text from a client.
    Message,
    /// Binary frame from a client.
    Binary,
    /// Payload pushed through the HTTP message endpoint.
    Broadcast,

    // ===== Content updates =====
    MediaUpdated,
    SettingsUpdated,
    PlaylistUpdated,

    /// Sent to a single connection whose frame was rejected.
    Error,
}

impl MessageKind {
    pub const ALL: [MessageKind; 11] = [
        MessageKind::Welcome,
        MessageKind::UserJoined,
        MessageKind::UserLeft,
        MessageKind::UserError,
        MessageKind::Message,
        MessageKind::Binary,
        MessageKind::Broadcast,
        MessageKind::MediaUpdated,
        MessageKind::SettingsUpdated,
        MessageKind::PlaylistUpdated,
        MessageKind::Error,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Welcome => "welcome",
            MessageKind::UserJoined => "user_joined",
            MessageKind::UserLeft => "user_left",
            MessageKind::UserError => "user_error",
            MessageKind::Message => "message",
            MessageKind::Binary => "binary",
            MessageKind::Broadcast => "broadcast",
            MessageKind::MediaUpdated => "media_updated",
            MessageKind::SettingsUpdated => "settings_updated",
            MessageKind::PlaylistUpdated => "playlist_updated",
            MessageKind::Error => "error",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for MessageKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// A server-built message. Optional fields are omitted from the wire when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(
        rename = "connectionCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_count: Option<usize>,
}

impl Envelope {
    /// A bare envelope stamped with the current time.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            message: None,
            content: None,
            data: None,
            timestamp: Utc::now(),
            connection_count: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_connection_count(mut self, count: usize) -> Self {
        self.connection_count = Some(count);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    // ===== Membership =====

    pub fn welcome(connection_count: usize) -> Self {
        Self::new(MessageKind::Welcome)
            .with_message("Connected to WebSocket broadcast server")
            .with_connection_count(connection_count)
    }

    pub fn user_joined(connection_count: usize) -> Self {
        Self::new(MessageKind::UserJoined)
            .with_message("A new user joined the chat")
            .with_connection_count(connection_count)
    }

    pub fn user_left(connection_count: usize) -> Self {
        Self::new(MessageKind::UserLeft)
            .with_message("A user left the chat")
            .with_connection_count(connection_count)
    }

    pub fn user_error(connection_count: usize) -> Self {
        Self::new(MessageKind::UserError)
            .with_message("A user disconnected due to an error")
            .with_connection_count(connection_count)
    }

    // ===== Relay =====

    pub fn text(content: impl Into<String>, connection_count: usize) -> Self {
        Self::new(MessageKind::Message)
            .with_content(content)
            .with_connection_count(connection_count)
    }

    pub fn binary(connection_count: usize) -> Self {
        Self::new(MessageKind::Binary)
            .with_content("Binary message received")
            .with_connection_count(connection_count)
    }

    pub fn broadcast(data: Value, connection_count: usize) -> Self {
        Self::new(MessageKind::Broadcast)
            .with_data(data)
            .with_connection_count(connection_count)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(MessageKind::Error).with_message(message)
    }

    // ===== Content updates =====

    pub fn media_updated() -> Self {
        Self::new(MessageKind::MediaUpdated)
    }

    pub fn settings_updated() -> Self {
        Self::new(MessageKind::SettingsUpdated)
    }

    pub fn playlist_updated() -> Self {
        Self::new(MessageKind::PlaylistUpdated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn kind_tags_are_snake_case() {
        for kind in MessageKind::ALL {
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, Value::String(kind.as_str().to_string()));
            assert_eq!(kind.as_str().parse::<MessageKind>().unwrap(), kind);
        }
        assert!("chat".parse::<MessageKind>().is_err());
    }

    #[test]
    fn welcome_wire_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let value = serde_json::to_value(Envelope::welcome(1).at(ts)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "welcome",
                "message": "Connected to WebSocket broadcast server",
                "timestamp": "2024-01-02T03:04:05.000Z",
                "connectionCount": 1
            })
        );
    }

    #[test]
    fn content_update_carries_only_type_and_timestamp() {
        let value = serde_json::to_value(Envelope::media_updated()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["type"], "media_updated");
        assert!(object["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn parses_back_from_wire() {
        let raw = r#"{"type":"user_left","message":"A user left the chat","timestamp":"2024-05-01T10:00:00.250Z","connectionCount":2}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.kind, MessageKind::UserLeft);
        assert_eq!(envelope.connection_count, Some(2));
        assert_eq!(envelope.timestamp.timestamp_subsec_millis(), 250);
    }
}
