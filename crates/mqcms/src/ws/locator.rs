//! Maps logical channel names to running hubs.

use dashmap::DashMap;
use tracing::{info, warn};

use super::hub::{BroadcastHub, HubHandle};
use crate::config::HubConfig;

/// Channel shared by every display and every content publisher.
pub const GLOBAL_CHANNEL: &str = "global-broadcaster";

/// Lazily creates one hub per channel name.
///
/// Resolution holds the map entry's lock while spawning, so concurrent
/// callers for the same name always get the same hub. A hub whose actor has
/// stopped is replaced on the next lookup.
pub struct HubLocator {
    hubs: DashMap<String, HubHandle>,
    config: HubConfig,
}

impl HubLocator {
    pub fn new(config: HubConfig) -> Self {
        Self {
            hubs: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn resolve(&self, name: &str) -> HubHandle {
        let mut entry = self.hubs.entry(name.to_string()).or_insert_with(|| {
            info!("Creating hub '{}'", name);
            BroadcastHub::spawn(name, &self.config)
        });
        if entry.is_closed() {
            warn!("Hub '{}' has stopped, starting a new one", name);
            *entry = BroadcastHub::spawn(name, &self.config);
        }
        entry.clone()
    }

    /// The configured default channel.
    pub fn default_hub(&self) -> HubHandle {
        self.resolve(&self.config.channel)
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}
