//! Client JSON objects relayed to peers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

const TIMESTAMP_KEY: &str = "timestamp";
const CONNECTION_COUNT_KEY: &str = "connectionCount";

/// A JSON object a client sent, forwarded with every original field intact.
///
/// `timestamp` and `connectionCount` always reflect the hub at relay time;
/// values the client supplied under those keys are dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayedMessage {
    #[serde(flatten)]
    fields: Map<String, Value>,

    #[serde(with = "crate::timestamp")]
    timestamp: DateTime<Utc>,

    #[serde(rename = "connectionCount")]
    connection_count: usize,
}

impl RelayedMessage {
    pub fn new(mut fields: Map<String, Value>, connection_count: usize) -> Self {
        fields.remove(TIMESTAMP_KEY);
        fields.remove(CONNECTION_COUNT_KEY);
        Self {
            fields,
            timestamp: Utc::now(),
            connection_count,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn connection_count(&self) -> usize {
        self.connection_count
    }

    /// The client's own `type` field, when it is a string.
    pub fn declared_type(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hub_fields_override_client_values() {
        let fields = json!({
            "type": "chat",
            "timestamp": "yesterday",
            "connectionCount": 99,
            "nested": {"a": [1, 2]}
        });
        let relayed = RelayedMessage::new(fields.as_object().unwrap().clone(), 3);
        let value = serde_json::to_value(&relayed).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 4);
        assert_eq!(object["type"], "chat");
        assert_eq!(object["nested"], json!({"a": [1, 2]}));
        assert_eq!(object["connectionCount"], 3);
        assert_ne!(object["timestamp"], "yesterday");
    }

    #[test]
    fn declared_type_ignores_non_strings() {
        let fields = json!({"type": 7});
        let relayed = RelayedMessage::new(fields.as_object().unwrap().clone(), 1);
        assert_eq!(relayed.declared_type(), None);
    }
}
