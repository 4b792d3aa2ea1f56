//! Display settings: how long each carousel section shows a slide.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::document;
use crate::storage::{Storage, StorageResult};

/// Key of the settings document in the documents store.
pub const SETTINGS_KEY: &str = "settings.json";

pub const MIN_INTERVAL_SECS: u64 = 1;
pub const MAX_INTERVAL_SECS: u64 = 3600;

const MAX_SECTION_NAME_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid section name '{0}'")]
    InvalidSection(String),

    #[error("interval for '{section}' must be between 1 and 3600 seconds, got {secs}")]
    IntervalOutOfRange { section: String, secs: u64 },

    #[error("unknown section '{0}'")]
    UnknownSection(String),
}

/// Slide interval in seconds per carousel section, e.g. `carousel_top_left`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    #[serde(default)]
    pub section_intervals: BTreeMap<String, u64>,
}

impl DisplaySettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (section, secs) in &self.section_intervals {
            let valid_name = !section.is_empty()
                && section.len() <= MAX_SECTION_NAME_LEN
                && section
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid_name {
                return Err(SettingsError::InvalidSection(section.clone()));
            }
            if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(secs) {
                return Err(SettingsError::IntervalOutOfRange {
                    section: section.clone(),
                    secs: *secs,
                });
            }
        }
        Ok(())
    }

    /// Load the stored settings. A missing document is the empty default.
    pub async fn load(storage: &dyn Storage) -> StorageResult<Self> {
        document::load(storage, SETTINGS_KEY).await
    }

    pub async fn save(&self, storage: &dyn Storage) -> StorageResult<()> {
        document::save(storage, SETTINGS_KEY, self).await
    }
}
