//! Which layout section each media object is shown in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{SettingsError, document, is_section};
use crate::storage::{Storage, StorageResult};

/// Key of the assignments document in the documents store.
pub const ASSIGNMENTS_KEY: &str = "assignments.json";

/// One media object placed in a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub key: String,
    pub section_key: String,
}

/// Media key to section. A media object is in at most one section; objects
/// with no entry are stored but not shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionAssignments(BTreeMap<String, String>);

impl SectionAssignments {
    pub async fn load(storage: &dyn Storage) -> StorageResult<Self> {
        document::load(storage, ASSIGNMENTS_KEY).await
    }

    pub async fn save(&self, storage: &dyn Storage) -> StorageResult<()> {
        document::save(storage, ASSIGNMENTS_KEY, self).await
    }

    pub fn section_of(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Place `key` in `section`, replacing any earlier placement.
    pub fn assign(&mut self, key: &str, section: &str) -> Result<Assignment, SettingsError> {
        if !is_section(section) {
            return Err(SettingsError::UnknownSection(section.to_string()));
        }
        self.0.insert(key.to_string(), section.to_string());
        Ok(Assignment {
            key: key.to_string(),
            section_key: section.to_string(),
        })
    }

    /// Remove the placement of `key`, returning the section it was in.
    pub fn unassign(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn to_list(&self) -> Vec<Assignment> {
        self.0
            .iter()
            .map(|(key, section)| Assignment {
                key: key.clone(),
                section_key: section.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    #[test]
    fn test_assign_known_sections_only() {
        let mut assignments = SectionAssignments::default();
        let placed = assignments.assign("1-a.png", "carousel_top_left").unwrap();
        assert_eq!(placed.section_key, "carousel_top_left");
        assert_eq!(assignments.section_of("1-a.png"), Some("carousel_top_left"));

        assert_eq!(
            assignments.assign("1-a.png", "sidebar"),
            Err(SettingsError::UnknownSection("sidebar".to_string()))
        );
        // a rejected move keeps the old placement
        assert_eq!(assignments.section_of("1-a.png"), Some("carousel_top_left"));

        assignments.assign("1-a.png", "footer_content").unwrap();
        assert_eq!(assignments.to_list().len(), 1);
        assert_eq!(assignments.unassign("1-a.png"), Some("footer_content".to_string()));
        assert!(assignments.to_list().is_empty());
        assert_eq!(assignments.unassign("1-a.png"), None);
    }

    #[test]
    fn test_wire_format() {
        let mut assignments = SectionAssignments::default();
        assignments.assign("2-b.mp4", "header_video").unwrap();
        assert_eq!(
            serde_json::to_value(&assignments).unwrap(),
            serde_json::json!({"2-b.mp4": "header_video"})
        );
        assert_eq!(
            serde_json::to_value(assignments.to_list()).unwrap(),
            serde_json::json!([{"key": "2-b.mp4", "section_key": "header_video"}])
        );
    }

    #[tokio::test]
    async fn test_load_missing_then_save() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(
            SectionAssignments::load(&storage)
                .await
                .unwrap()
                .to_list()
                .is_empty()
        );

        let mut assignments = SectionAssignments::default();
        assignments.assign("3-c.webp", "carousel_bottom_right").unwrap();
        assignments.save(&storage).await.unwrap();

        assert_eq!(SectionAssignments::load(&storage).await.unwrap(), assignments);
    }
}
