//! File-cloud API response types
//!
//! Data structures for deserializing the public filesystem and events API
//! responses.

use serde::Deserialize;
use std::collections::HashMap;

/// Filesystem entry as returned by the metadata endpoint with
/// `list_custom_metadata=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct FsEntry {
    pub path: String,
    pub name: String,
    pub entry_id: String,
    pub group_id: String,
    #[serde(default)]
    pub is_folder: bool,
    /// List of single-section objects keyed by namespace.
    #[serde(default)]
    pub custom_metadata: Vec<HashMap<String, serde_json::Value>>,
}

impl FsEntry {
    /// Flatten the namespace-keyed section list into a map.
    pub fn sections(&self) -> HashMap<String, serde_json::Value> {
        let mut sections = HashMap::new();
        for item in &self.custom_metadata {
            for (namespace, section) in item {
                sections.insert(namespace.clone(), section.clone());
            }
        }
        sections
    }
}

/// Events cursor endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsCursor {
    pub oldest_event_id: u64,
    pub latest_event_id: u64,
}

/// One change event from the events endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: u64,
    pub action: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub target_path: String,
    #[serde(default)]
    pub is_folder: bool,
}

/// Events endpoint response page.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsPage {
    #[serde(default)]
    pub results: Vec<Event>,
}

/// Custom-metadata search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub name: String,
    pub group_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_sections_flattened() {
        let entry: FsEntry = serde_json::from_value(json!({
            "path": "/Shared/assays/plate1.xlsx",
            "name": "plate1.xlsx",
            "entry_id": "e-1",
            "group_id": "g-1",
            "is_folder": false,
            "custom_metadata": [
                { "vault": { "mapping template id": "mt-1" } },
                { "audit": { "owner": "lab" } }
            ]
        }))
        .unwrap();

        let sections = entry.sections();
        assert_eq!(sections["vault"]["mapping template id"], "mt-1");
        assert_eq!(sections["audit"]["owner"], "lab");
    }

    #[test]
    fn test_event_defaults() {
        let event: Event = serde_json::from_value(json!({
            "id": 42,
            "action": "create"
        }))
        .unwrap();
        assert_eq!(event.id, 42);
        assert!(!event.data.is_folder);
        assert!(event.data.target_path.is_empty());
    }
}
