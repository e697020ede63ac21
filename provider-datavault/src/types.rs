//! Data-vault API response types

use bridge_traits::vault::{HeaderMapping, ProtocolDef, SlurpState, VaultRun};
use serde::Deserialize;

/// Mapping template resource. The vault uses numeric template ids; the
/// pipeline carries them as strings because folder metadata does.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingTemplateResp {
    pub id: u64,
    #[serde(default)]
    pub header_mappings: Vec<HeaderMapping>,
}

/// Protocol lookup page (`GET protocols?names=...`).
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolLookupPage {
    pub count: u64,
    #[serde(default)]
    pub objects: Vec<ProtocolDef>,
}

/// Recent-runs listing page (`GET protocols?runs_modified_after=...`).
#[derive(Debug, Clone, Deserialize)]
pub struct RecentRunsPage {
    #[serde(default)]
    pub objects: Vec<ProtocolWithRuns>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolWithRuns {
    pub name: String,
    #[serde(default)]
    pub runs: Vec<RunResp>,
}

/// One run inside a recent-runs listing. The processed marker and the
/// correlation id are run-level custom fields on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RunResp {
    pub id: u64,
    pub project: ProjectRef,
    #[serde(rename = "data load processed", default)]
    pub processed: Option<String>,
    #[serde(rename = "conditions", default)]
    pub conditions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRef {
    pub name: String,
}

impl From<RunResp> for VaultRun {
    fn from(run: RunResp) -> Self {
        VaultRun {
            id: run.id,
            project: run.project.name,
            processed: run.processed.as_deref() == Some("Yes"),
            correlation_id: run.conditions,
        }
    }
}

/// Slurp job resource.
#[derive(Debug, Clone, Deserialize)]
pub struct SlurpResp {
    pub id: u64,
    pub state: SlurpState,
}
