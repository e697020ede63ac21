//! Upload orchestration
//!
//! Groups validated files by run key, builds one combined CSV submission per
//! group, drives the slurp job to a terminal state and writes outcome
//! metadata back onto every source file.

use bridge_traits::storage::MetadataStore;
use bridge_traits::vault::{SlurpRequest, VaultGateway};
use core_validate::AssayRunFile;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::metadata::{write_back, FileStatus};
use crate::poller::{JobPoller, PollOutcome};

/// Outcome of one run-key group inside an upload batch.
#[derive(Debug, Clone)]
pub struct GroupOutcome {
    pub run_key: String,
    /// Slurp job id; `None` when nothing was submitted (empty payload or
    /// dry run).
    pub slurp_id: Option<u64>,
    pub files: usize,
    pub valid_files: usize,
    pub error: Option<String>,
}

pub struct UploadOrchestrator {
    vault: Arc<dyn VaultGateway>,
    metadata: Arc<dyn MetadataStore>,
    poller: JobPoller,
    project: String,
    namespace: String,
    dry_run: bool,
}

impl UploadOrchestrator {
    pub fn new(
        vault: Arc<dyn VaultGateway>,
        metadata: Arc<dyn MetadataStore>,
        poller: JobPoller,
        project: impl Into<String>,
        namespace: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            vault,
            metadata,
            poller,
            project: project.into(),
            namespace: namespace.into(),
            dry_run,
        }
    }

    /// Upload one mapping template's batch, grouped by run key.
    ///
    /// Group failures are recorded on the returned outcomes, never abort
    /// sibling groups. Only cancellation stops the batch early.
    #[instrument(skip(self, files, token), fields(mapping_template_id = %mapping_template_id))]
    pub async fn upload(
        &self,
        mapping_template_id: &str,
        files: Vec<AssayRunFile>,
        token: &CancellationToken,
    ) -> Result<Vec<GroupOutcome>> {
        let mut groups: BTreeMap<String, Vec<AssayRunFile>> = BTreeMap::new();
        for file in files {
            groups.entry(file.run_key.clone()).or_default().push(file);
        }

        let mut outcomes = Vec::with_capacity(groups.len());
        for (run_key, group) in groups {
            if token.is_cancelled() {
                warn!("cancellation requested, leaving remaining groups unsubmitted");
                break;
            }
            let outcome = self
                .upload_group(mapping_template_id, &run_key, &group, token)
                .await;
            let cancelled = outcome.error.as_deref() == Some("cancelled");
            outcomes.push(outcome);
            if cancelled {
                break;
            }
        }
        Ok(outcomes)
    }

    async fn upload_group(
        &self,
        mapping_template_id: &str,
        run_key: &str,
        group: &[AssayRunFile],
        token: &CancellationToken,
    ) -> GroupOutcome {
        let valid_files = group.iter().filter(|f| f.valid).count();
        let mut outcome = GroupOutcome {
            run_key: run_key.to_string(),
            slurp_id: None,
            files: group.len(),
            valid_files,
            error: None,
        };

        let correlation_id = Uuid::new_v4().to_string();
        let (csv, data_rows) = match build_payload(group) {
            Ok(built) => built,
            Err(e) => {
                outcome.error = Some(format!("payload build failed: {}", e));
                return outcome;
            }
        };

        if data_rows == 0 {
            // Nothing submittable. Write the failed status back anyway so
            // the next pass does not silently skip these files without
            // operator visibility.
            info!(run_key = %run_key, files = group.len(), "no valid data rows in group");
            self.write_back_group(group, |_| FileStatus::Failed, None, &correlation_id)
                .await;
            return outcome;
        }

        let file_name = payload_name(group, run_key);
        if self.dry_run {
            info!(
                run_key = %run_key,
                data_rows,
                file_name = %file_name,
                "dry run: skipping submission"
            );
            return outcome;
        }

        let request = SlurpRequest {
            project: self.project.clone(),
            mapping_template_id: mapping_template_id.to_string(),
            file_name,
            csv,
            correlation_id: correlation_id.clone(),
            autoreject: false,
        };

        let slurp_id = match self.vault.submit_slurp(request).await {
            Ok(id) => id,
            Err(e) => {
                // No write-back here: the entry ids stay unrecorded so the
                // files are retried on the next pass.
                outcome.error = Some(format!("submission failed: {}", e));
                return outcome;
            }
        };
        outcome.slurp_id = Some(slurp_id);
        info!(run_key = %run_key, slurp_id, data_rows, "submitted slurp job");

        let vault = self.vault.clone();
        let poll_result = self
            .poller
            .wait(
                slurp_id,
                |id| {
                    let vault = vault.clone();
                    async move { vault.slurp_status(id).await }
                },
                |id| {
                    let vault = vault.clone();
                    async move { vault.cancel_slurp(id).await }
                },
                token,
            )
            .await;

        match poll_result {
            Ok(PollOutcome::Completed(_)) => {
                self.write_back_group(
                    group,
                    |f| {
                        if f.valid {
                            FileStatus::Processing
                        } else {
                            FileStatus::Failed
                        }
                    },
                    Some(slurp_id),
                    &correlation_id,
                )
                .await;
            }
            Ok(PollOutcome::Cancelled) => {
                self.write_back_group(group, |_| FileStatus::Failed, Some(slurp_id), &correlation_id)
                    .await;
                outcome.error = Some("cancelled".to_string());
            }
            Err(e) => {
                // Terminal failure on the remote side; the status write-back
                // is still attempted so the outcome is visible on the files.
                self.write_back_group(group, |_| FileStatus::Failed, Some(slurp_id), &correlation_id)
                    .await;
                outcome.error = Some(e.to_string());
            }
        }

        outcome
    }

    async fn write_back_group<F>(
        &self,
        group: &[AssayRunFile],
        status_for: F,
        slurp_id: Option<u64>,
        correlation_id: &str,
    ) where
        F: Fn(&AssayRunFile) -> FileStatus,
    {
        if self.dry_run {
            return;
        }
        for file in group {
            let section = write_back(status_for(file), slurp_id, &file.entry_id, correlation_id);
            if let Err(e) = self
                .metadata
                .set_metadata(&file.group_id, &self.namespace, section)
                .await
            {
                warn!(file = %file.source_name, "status write-back failed: {}", e);
            }
        }
    }
}

/// Build the combined CSV payload: the header row of the first contributing
/// file, then the data rows of every valid file. Returns the payload and the
/// number of data rows.
fn build_payload(group: &[AssayRunFile]) -> std::result::Result<(String, usize), csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut data_rows = 0usize;
    let mut header_written = false;

    for file in group.iter().filter(|f| f.valid) {
        if file.data_array.is_empty() {
            continue;
        }
        if !header_written {
            write_row(&mut writer, &file.data_array[0])?;
            header_written = true;
        }
        for row in file.data_rows() {
            write_row(&mut writer, row)?;
            data_rows += 1;
        }
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let csv = String::from_utf8(bytes).unwrap_or_default();
    Ok((csv, data_rows))
}

fn write_row(
    writer: &mut csv::Writer<Vec<u8>>,
    row: &[bridge_traits::CellValue],
) -> std::result::Result<(), csv::Error> {
    writer.write_record(row.iter().map(|cell| cell.to_text()))
}

/// Submission file name: first valid file's name with a `.csv` extension.
fn payload_name(group: &[AssayRunFile], run_key: &str) -> String {
    group
        .iter()
        .find(|f| f.valid && !f.data_array.is_empty())
        .map(|f| {
            let stem = f
                .source_name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(&f.source_name);
            format!("{}.csv", stem)
        })
        .unwrap_or_else(|| {
            if run_key.is_empty() {
                "combined.csv".to_string()
            } else {
                format!("{}.csv", run_key.replace(['|', '/'], "_"))
            }
        })
}
