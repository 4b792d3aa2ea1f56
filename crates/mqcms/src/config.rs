//! Application configuration.
//!
//! Loaded by the binary from defaults, then `config.toml`, then
//! `MQCMS__SECTION__KEY` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;
use crate::ws::GLOBAL_CHANNEL;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub hub: HubConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of the display/admin frontend. Unset serves only the API.
    pub static_dir: Option<String>,
    /// Origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            static_dir: None,
            allowed_origins: Vec::new(),
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

/// Broadcast hub tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Logical channel every display and publisher resolves to.
    pub channel: String,
    /// Depth of each hub's command queue.
    pub command_buffer: usize,
    /// Depth of each connection's outbound queue. A full queue drops the connection.
    pub connection_buffer: usize,
    /// Largest client text frame that is relayed.
    pub max_message_bytes: usize,
    /// Send websocket pings at this interval; peers silent for two intervals
    /// are dropped. Unset disables heartbeats.
    pub heartbeat_interval_secs: Option<u64>,
}

impl HubConfig {
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel: GLOBAL_CHANNEL.to_string(),
            command_buffer: 256,
            connection_buffer: 64,
            max_message_bytes: 64 * 1024,
            heartbeat_interval_secs: None,
        }
    }
}

/// Storage roots. Unset directories live under the data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding uploaded media objects.
    pub media_dir: Option<String>,
    /// Directory holding JSON documents such as display settings.
    pub documents_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let rendered = toml::to_string_pretty(&AppConfig::default()).unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.hub.channel, GLOBAL_CHANNEL);
        assert_eq!(parsed.server.port, 8787);
        assert!(parsed.hub.heartbeat_interval_secs.is_none());
    }

    #[test]
    fn default_file_has_only_section_tables() {
        let rendered = toml::to_string_pretty(&AppConfig::default()).unwrap();
        let table: toml::Table = toml::from_str(&rendered).unwrap();
        assert!(table.values().all(toml::Value::is_table));
        assert!(!table.contains_key("profile"));
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let parsed: AppConfig = toml::from_str("[hub]\nheartbeat_interval_secs = 30\n").unwrap();
        assert_eq!(parsed.hub.heartbeat_interval(), Some(Duration::from_secs(30)));
        assert_eq!(parsed.hub.connection_buffer, 64);
        assert_eq!(parsed.server.host, "127.0.0.1");
    }

    #[test]
    fn zero_heartbeat_disables_pings() {
        let hub = HubConfig {
            heartbeat_interval_secs: Some(0),
            ..HubConfig::default()
        };
        assert_eq!(hub.heartbeat_interval(), None);
    }
}
