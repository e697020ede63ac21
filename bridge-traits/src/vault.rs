//! Scientific-data vault abstraction
//!
//! Wire types and the gateway trait for the vault: mapping templates,
//! protocols, bulk-ingestion ("slurp") jobs, and run write-back.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Semantic role of a mapped spreadsheet column, as declared by the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "InternalFieldDefinition::MoleculeSynonym")]
    MoleculeSynonym,
    #[serde(rename = "InternalFieldDefinition::BatchName")]
    BatchName,
    #[serde(rename = "InternalFieldDefinition::WellLocation")]
    WellLocation,
    #[serde(rename = "ReadoutDefinition")]
    Readout,
    #[serde(other)]
    Other,
}

/// Column definition inside a mapping template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub name: String,
    /// Present on readout definitions; names the protocol the readout
    /// belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_name: Option<String>,
}

/// Expected spreadsheet header name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderName {
    pub name: String,
}

/// One header-to-definition mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderMapping {
    pub header: HeaderName,
    pub definition: FieldDefinition,
}

/// Declarative schema describing the expected spreadsheet columns and their
/// semantic roles. Fetched once per id and cached for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingTemplate {
    pub id: String,
    pub header_mappings: Vec<HeaderMapping>,
}

/// Readout definition inside a protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadoutDefinition {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub protocol_condition: bool,
}

/// Protocol as returned by the vault. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolDef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub readout_definitions: Vec<ReadoutDefinition>,
}

/// Lifecycle state of a slurp (bulk-ingestion) job. Owned by the vault; the
/// pipeline only observes transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlurpState {
    Queued,
    InProgress,
    Finished,
    Failed,
}

impl SlurpState {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, SlurpState::Queued | SlurpState::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlurpState::Queued => "queued",
            SlurpState::InProgress => "in_progress",
            SlurpState::Finished => "finished",
            SlurpState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SlurpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Remote slurp job handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlurpJob {
    pub id: u64,
    pub state: SlurpState,
}

/// One combined tabular submission.
#[derive(Debug, Clone, Serialize)]
pub struct SlurpRequest {
    pub project: String,
    pub mapping_template_id: String,
    pub file_name: String,
    /// CSV payload: one header row followed by the concatenated data rows of
    /// every valid file in the group.
    pub csv: String,
    /// Correlation id shared by every source file of the submission.
    pub correlation_id: String,
    pub autoreject: bool,
}

/// A vault run observed during post-processing.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultRun {
    pub id: u64,
    pub project: String,
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// Runs of one protocol modified inside the post-processing window.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolRuns {
    pub protocol_name: String,
    pub runs: Vec<VaultRun>,
}

/// Vault API surface used by the pipeline.
#[async_trait]
pub trait VaultGateway: Send + Sync {
    async fn get_mapping_template(&self, mapping_template_id: &str) -> Result<MappingTemplate>;

    /// Look up a protocol by exact name. More than one match is an error:
    /// condition extraction needs an unambiguous protocol.
    async fn get_protocol(&self, name: &str) -> Result<ProtocolDef>;

    /// Submit a combined payload; returns the new slurp job id.
    async fn submit_slurp(&self, request: SlurpRequest) -> Result<u64>;

    async fn slurp_status(&self, slurp_id: u64) -> Result<SlurpJob>;

    /// Best-effort cancel of an in-flight slurp job.
    async fn cancel_slurp(&self, slurp_id: u64) -> Result<()>;

    /// List protocols with runs modified after the given instant.
    async fn list_recent_runs(&self, modified_after: DateTime<Utc>) -> Result<Vec<ProtocolRuns>>;

    /// Update fields on a run (e.g. the processed marker).
    async fn set_run_fields(&self, run_id: u64, fields: serde_json::Value) -> Result<()>;

    /// Attach a source file to a run.
    async fn attach_run_file(&self, run_id: u64, file_name: &str, content: Bytes) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_kind_wire_names() {
        let def: FieldDefinition = serde_json::from_str(
            r#"{"id": 3, "type": "InternalFieldDefinition::BatchName", "name": "Batch"}"#,
        )
        .unwrap();
        assert_eq!(def.kind, FieldKind::BatchName);

        let def: FieldDefinition = serde_json::from_str(
            r#"{"id": 9, "type": "InternalFieldDefinition::Project", "name": "Project"}"#,
        )
        .unwrap();
        assert_eq!(def.kind, FieldKind::Other);
    }

    #[test]
    fn test_slurp_state_progress() {
        assert!(SlurpState::Queued.is_in_progress());
        assert!(SlurpState::InProgress.is_in_progress());
        assert!(!SlurpState::Finished.is_in_progress());
        assert!(!SlurpState::Failed.is_in_progress());
    }

    #[test]
    fn test_slurp_state_wire_names() {
        let job: SlurpJob = serde_json::from_str(r#"{"id": 11, "state": "in_progress"}"#).unwrap();
        assert_eq!(job.state, SlurpState::InProgress);
    }
}
