//! Remote file-store abstractions
//!
//! Two seams onto the file-storage system: entry metadata (including the
//! namespaced custom-metadata sections the pipeline reads folder
//! configuration and write-back status from) and raw file content.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

use crate::error::Result;

/// Metadata for one remote file or folder.
///
/// `entry_id` identifies the current version of the entry; it changes when
/// the content changes. `group_id` is stable across versions and is the
/// handle write-back metadata is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    pub entry_id: String,
    pub group_id: String,
    pub is_folder: bool,
    /// Custom metadata sections keyed by namespace.
    pub custom_metadata: HashMap<String, serde_json::Value>,
}

impl FileEntry {
    /// Look up one custom-metadata section by namespace.
    pub fn metadata_section(&self, namespace: &str) -> Option<&serde_json::Value> {
        self.custom_metadata.get(namespace)
    }

    /// Read a string field out of a namespaced section.
    pub fn metadata_str(&self, namespace: &str, key: &str) -> Option<&str> {
        self.metadata_section(namespace)?.get(key)?.as_str()
    }
}

/// Entry metadata access.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch metadata for the entry at `path`. Returns `Ok(None)` when the
    /// entry does not exist; absence is a valid outcome, not an error.
    async fn get_metadata(&self, path: &str) -> Result<Option<FileEntry>>;

    /// Merge `data` into the custom-metadata section `namespace` of the
    /// entry identified by `group_id`.
    async fn set_metadata(
        &self,
        group_id: &str,
        namespace: &str,
        data: serde_json::Value,
    ) -> Result<()>;
}

/// A downloaded source file located by its recorded correlation id.
#[derive(Debug, Clone)]
pub struct CorrelatedFile {
    pub name: String,
    pub group_id: String,
    pub content: Bytes,
}

/// File content access.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Download the full content of the file at `path`.
    async fn download(&self, path: &str) -> Result<Bytes>;

    /// Find and download every file whose write-back metadata carries the
    /// given correlation id. Used by run post-processing to attach source
    /// files back onto the completed vault run.
    async fn find_by_correlation(&self, correlation_id: &str) -> Result<Vec<CorrelatedFile>>;
}
