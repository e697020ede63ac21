//! Custom-metadata conventions
//!
//! The pipeline configures itself from, and writes its outcomes back to, one
//! namespaced custom-metadata section on the remote file store. The key
//! names here are the on-store contract and must stay stable across
//! releases.

use serde_json::json;

/// Default custom-metadata namespace holding pipeline state.
pub const DEFAULT_NAMESPACE: &str = "vault";

/// Folder-level key naming the mapping template used for files below it.
pub const MAPPING_TEMPLATE_ID_KEY: &str = "mapping template id";

/// File-level key recording the entry id last handed to the vault. The
/// idempotency gate compares it against the file's current entry id.
pub const LOADED_ENTRY_ID_KEY: &str = "loaded entry id";

/// File-level processing status key.
pub const STATUS_KEY: &str = "status";

/// File-level key recording the slurp job the file was part of.
pub const SLURP_ID_KEY: &str = "slurp id";

/// File-level key recording the correlation id shared by a submission.
pub const CORRELATION_ID_KEY: &str = "correlation id";

/// Vault run field marking post-processing as done.
pub const RUN_PROCESSED_FIELD: &str = "data load processed";

/// Per-file status written after a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Processing,
    Failed,
    Success,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Processing => "Processing",
            FileStatus::Failed => "Failed",
            FileStatus::Success => "Success",
        }
    }
}

/// Build the write-back section for one file after an upload attempt.
///
/// The entry id is always recorded, valid or not: a file that will never
/// validate should not be re-ingested until its content actually changes.
pub fn write_back(
    status: FileStatus,
    slurp_id: Option<u64>,
    entry_id: &str,
    correlation_id: &str,
) -> serde_json::Value {
    let mut section = json!({
        STATUS_KEY: status.as_str(),
        LOADED_ENTRY_ID_KEY: entry_id,
        CORRELATION_ID_KEY: correlation_id,
    });
    if let Some(id) = slurp_id {
        section[SLURP_ID_KEY] = json!(id);
    }
    section
}
