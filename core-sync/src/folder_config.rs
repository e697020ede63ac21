//! Per-folder processing configuration
//!
//! A folder opts its files into ingestion by carrying a mapping template id
//! in its namespaced custom metadata. Resolution is exactly one level up
//! from the file: earlier variants walked the ancestor chain with a depth
//! cap, but folder-metadata conventions settled on configuring the direct
//! parent, so the walk was dropped.

use bridge_traits::storage::MetadataStore;
use std::sync::Arc;
use tracing::debug;

use crate::metadata::MAPPING_TEMPLATE_ID_KEY;

/// Processing configuration resolved from a folder's custom metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderConfig {
    pub mapping_template_id: Option<String>,
    /// The full namespaced section, for keys this crate does not interpret.
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl FolderConfig {
    fn from_section(section: &serde_json::Value) -> Self {
        Self {
            mapping_template_id: section
                .get(MAPPING_TEMPLATE_ID_KEY)
                .and_then(|v| v.as_str())
                .map(str::to_string),
            raw: section.as_object().cloned().unwrap_or_default(),
        }
    }
}

pub struct FolderConfigResolver {
    metadata: Arc<dyn MetadataStore>,
    namespace: String,
}

impl FolderConfigResolver {
    pub fn new(metadata: Arc<dyn MetadataStore>, namespace: impl Into<String>) -> Self {
        Self {
            metadata,
            namespace: namespace.into(),
        }
    }

    /// Resolve the configuration governing `path`, looking at its immediate
    /// parent folder only. Absence and metadata fetch errors both yield
    /// `None`: an unconfigured folder is a valid terminal outcome and must
    /// not stall the rest of the pass.
    pub async fn resolve(&self, path: &str) -> Option<FolderConfig> {
        let parent = parent_of(path)?;
        let entry = match self.metadata.get_metadata(parent).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(parent, "parent folder has no metadata");
                return None;
            }
            Err(e) => {
                debug!(parent, "folder metadata fetch failed, treating as unconfigured: {}", e);
                return None;
            }
        };

        entry
            .metadata_section(&self.namespace)
            .map(FolderConfig::from_section)
    }
}

/// Parent of a remote `/`-separated path. The root has no parent.
fn parent_of(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let (parent, _) = trimmed.rsplit_once('/')?;
    if parent.is_empty() {
        Some("/")
    } else {
        Some(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::storage::FileEntry;
    use std::collections::HashMap;

    struct OneFolderStore {
        folder_path: String,
        section: Option<serde_json::Value>,
        fail: bool,
    }

    #[async_trait]
    impl MetadataStore for OneFolderStore {
        async fn get_metadata(&self, path: &str) -> BridgeResult<Option<FileEntry>> {
            if self.fail {
                return Err(BridgeError::OperationFailed("permission denied".into()));
            }
            if path != self.folder_path {
                return Ok(None);
            }
            let mut custom_metadata = HashMap::new();
            if let Some(section) = &self.section {
                custom_metadata.insert("vault".to_string(), section.clone());
            }
            Ok(Some(FileEntry {
                path: path.to_string(),
                name: "assays".into(),
                entry_id: "folder-e".into(),
                group_id: "folder-g".into(),
                is_folder: true,
                custom_metadata,
            }))
        }

        async fn set_metadata(
            &self,
            _group_id: &str,
            _namespace: &str,
            _data: serde_json::Value,
        ) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_resolves_parent_section() {
        let resolver = FolderConfigResolver::new(
            Arc::new(OneFolderStore {
                folder_path: "/Shared/assays".into(),
                section: Some(serde_json::json!({"mapping template id": "mt-9"})),
                fail: false,
            }),
            "vault",
        );

        let config = resolver.resolve("/Shared/assays/plate1.xlsx").await.unwrap();
        assert_eq!(config.mapping_template_id.as_deref(), Some("mt-9"));
    }

    #[tokio::test]
    async fn test_grandparent_config_is_not_consulted() {
        // Config sits two levels up; single-level resolution must miss it.
        let resolver = FolderConfigResolver::new(
            Arc::new(OneFolderStore {
                folder_path: "/Shared".into(),
                section: Some(serde_json::json!({"mapping template id": "mt-9"})),
                fail: false,
            }),
            "vault",
        );

        assert!(resolver.resolve("/Shared/assays/plate1.xlsx").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_error_is_unconfigured() {
        let resolver = FolderConfigResolver::new(
            Arc::new(OneFolderStore {
                folder_path: "/Shared/assays".into(),
                section: None,
                fail: true,
            }),
            "vault",
        );

        assert!(resolver.resolve("/Shared/assays/plate1.xlsx").await.is_none());
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("/Shared/assays/p.xlsx"), Some("/Shared/assays"));
        assert_eq!(parent_of("/p.xlsx"), Some("/"));
        assert_eq!(parent_of("p.xlsx"), None);
    }
}
