//! Vault-run post-processing
//!
//! Second half of the pipeline: after slurp jobs complete, the vault holds
//! new runs. This pass attaches the original source files to each run,
//! flips the file status metadata to `Success`, marks the run as processed
//! and announces which assays produced data.

use bridge_traits::notify::Notifier;
use bridge_traits::storage::{FileStore, MetadataStore};
use bridge_traits::vault::{VaultGateway, VaultRun};
use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::metadata::{FileStatus, RUN_PROCESSED_FIELD, STATUS_KEY};

/// Window over which modified runs are considered.
pub const DEFAULT_RUN_LOOKBACK_HOURS: i64 = 24;

/// Summary of one post-processing pass.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub runs_seen: usize,
    pub runs_processed: usize,
    pub files_attached: usize,
    /// Assay names that produced data this pass, sorted.
    pub assay_names: Vec<String>,
}

pub struct RunPostProcessor {
    vault: Arc<dyn VaultGateway>,
    files: Arc<dyn FileStore>,
    metadata: Arc<dyn MetadataStore>,
    notifier: Arc<dyn Notifier>,
    project: String,
    namespace: String,
    lookback: Duration,
    dry_run: bool,
}

impl RunPostProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vault: Arc<dyn VaultGateway>,
        files: Arc<dyn FileStore>,
        metadata: Arc<dyn MetadataStore>,
        notifier: Arc<dyn Notifier>,
        project: impl Into<String>,
        namespace: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            vault,
            files,
            metadata,
            notifier,
            project: project.into(),
            namespace: namespace.into(),
            lookback: Duration::hours(DEFAULT_RUN_LOOKBACK_HOURS),
            dry_run,
        }
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    /// Process every unprocessed run modified inside the lookback window.
    ///
    /// A run that fails to process is logged and skipped; it stays
    /// unprocessed and is retried on the next pass.
    #[instrument(skip(self))]
    pub async fn process_runs(&self) -> Result<RunReport> {
        let modified_after = Utc::now() - self.lookback;
        let protocols = self.vault.list_recent_runs(modified_after).await?;

        let mut report = RunReport::default();
        let mut assay_names = BTreeSet::new();

        for protocol in protocols {
            for run in &protocol.runs {
                report.runs_seen += 1;
                if run.project != self.project {
                    debug!(run_id = run.id, project = %run.project, "run belongs to another project");
                    continue;
                }
                if run.processed {
                    debug!(run_id = run.id, "run already processed");
                    continue;
                }
                if self.dry_run {
                    info!(run_id = run.id, protocol = %protocol.protocol_name, "dry run: would process run");
                    continue;
                }
                match self.process_run(run).await {
                    Ok(attached) => {
                        report.runs_processed += 1;
                        report.files_attached += attached;
                        assay_names.insert(protocol.protocol_name.clone());
                    }
                    Err(e) => {
                        warn!(run_id = run.id, "run post-processing failed: {}", e);
                    }
                }
            }
        }

        report.assay_names = assay_names.into_iter().collect();
        if !report.assay_names.is_empty() {
            if let Err(e) = self
                .notifier
                .results_available(&self.project, &report.assay_names)
                .await
            {
                warn!("result notification failed: {}", e);
            }
        }

        info!(
            runs_seen = report.runs_seen,
            runs_processed = report.runs_processed,
            files_attached = report.files_attached,
            "run post-processing pass finished"
        );
        Ok(report)
    }

    /// Attach source files, flip their status, mark the run processed.
    /// Returns the number of files attached.
    async fn process_run(&self, run: &VaultRun) -> Result<usize> {
        let mut attached = 0usize;

        if let Some(correlation_id) = run.correlation_id.as_deref() {
            let sources = self.files.find_by_correlation(correlation_id).await?;
            for source in sources {
                let attach_name = format!("Source - {}", source.name);
                self.vault
                    .attach_run_file(run.id, &attach_name, source.content.clone())
                    .await?;
                attached += 1;

                let section = json!({ STATUS_KEY: FileStatus::Success.as_str() });
                if let Err(e) = self
                    .metadata
                    .set_metadata(&source.group_id, &self.namespace, section)
                    .await
                {
                    warn!(file = %source.name, "success status write failed: {}", e);
                }
            }
        } else {
            debug!(run_id = run.id, "run carries no correlation id, nothing to attach");
        }

        self.vault
            .set_run_fields(run.id, json!({ RUN_PROCESSED_FIELD: true }))
            .await?;
        info!(run_id = run.id, attached, "run marked processed");
        Ok(attached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::storage::{CorrelatedFile, FileEntry};
    use bridge_traits::vault::{
        MappingTemplate, ProtocolDef, ProtocolRuns, SlurpJob, SlurpRequest,
    };
    use bytes::Bytes;
    use chrono::DateTime;
    use std::sync::Mutex;

    struct FakeVault {
        protocols: Vec<ProtocolRuns>,
        attached: Mutex<Vec<(u64, String)>>,
        field_writes: Mutex<Vec<(u64, serde_json::Value)>>,
    }

    impl FakeVault {
        fn new(protocols: Vec<ProtocolRuns>) -> Self {
            Self {
                protocols,
                attached: Mutex::new(Vec::new()),
                field_writes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VaultGateway for FakeVault {
        async fn get_mapping_template(&self, _id: &str) -> BridgeResult<MappingTemplate> {
            unimplemented!()
        }

        async fn get_protocol(&self, _name: &str) -> BridgeResult<ProtocolDef> {
            unimplemented!()
        }

        async fn submit_slurp(&self, _request: SlurpRequest) -> BridgeResult<u64> {
            unimplemented!()
        }

        async fn slurp_status(&self, _slurp_id: u64) -> BridgeResult<SlurpJob> {
            unimplemented!()
        }

        async fn cancel_slurp(&self, _slurp_id: u64) -> BridgeResult<()> {
            unimplemented!()
        }

        async fn list_recent_runs(
            &self,
            _modified_after: DateTime<Utc>,
        ) -> BridgeResult<Vec<ProtocolRuns>> {
            Ok(self.protocols.clone())
        }

        async fn set_run_fields(
            &self,
            run_id: u64,
            fields: serde_json::Value,
        ) -> BridgeResult<()> {
            self.field_writes.lock().unwrap().push((run_id, fields));
            Ok(())
        }

        async fn attach_run_file(
            &self,
            run_id: u64,
            file_name: &str,
            _content: Bytes,
        ) -> BridgeResult<()> {
            self.attached
                .lock()
                .unwrap()
                .push((run_id, file_name.to_string()));
            Ok(())
        }
    }

    struct FakeFiles {
        correlated: Vec<CorrelatedFile>,
    }

    #[async_trait]
    impl FileStore for FakeFiles {
        async fn download(&self, path: &str) -> BridgeResult<Bytes> {
            Err(BridgeError::NotFound(path.to_string()))
        }

        async fn find_by_correlation(
            &self,
            correlation_id: &str,
        ) -> BridgeResult<Vec<CorrelatedFile>> {
            Ok(self
                .correlated
                .iter()
                .filter(|_| !correlation_id.is_empty())
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingMetadata {
        writes: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl MetadataStore for RecordingMetadata {
        async fn get_metadata(&self, _path: &str) -> BridgeResult<Option<FileEntry>> {
            Ok(None)
        }

        async fn set_metadata(
            &self,
            group_id: &str,
            _namespace: &str,
            data: serde_json::Value,
        ) -> BridgeResult<()> {
            self.writes
                .lock()
                .unwrap()
                .push((group_id.to_string(), data));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn results_available(
            &self,
            project: &str,
            assay_names: &[String],
        ) -> BridgeResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((project.to_string(), assay_names.to_vec()));
            Ok(())
        }
    }

    fn run(id: u64, project: &str, processed: bool, correlation_id: Option<&str>) -> VaultRun {
        VaultRun {
            id,
            project: project.to_string(),
            processed,
            correlation_id: correlation_id.map(str::to_string),
        }
    }

    fn processor(
        vault: Arc<FakeVault>,
        files: Arc<FakeFiles>,
        metadata: Arc<RecordingMetadata>,
        notifier: Arc<RecordingNotifier>,
        dry_run: bool,
    ) -> RunPostProcessor {
        RunPostProcessor::new(vault, files, metadata, notifier, "Pluto", "vault", dry_run)
    }

    #[tokio::test]
    async fn test_attaches_sources_and_marks_processed() {
        let vault = Arc::new(FakeVault::new(vec![ProtocolRuns {
            protocol_name: "Kinase Panel".to_string(),
            runs: vec![run(7, "Pluto", false, Some("corr-1"))],
        }]));
        let files = Arc::new(FakeFiles {
            correlated: vec![CorrelatedFile {
                name: "plate1.xlsx".to_string(),
                group_id: "g-1".to_string(),
                content: Bytes::from_static(b"cells"),
            }],
        });
        let metadata = Arc::new(RecordingMetadata::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let report = processor(
            vault.clone(),
            files,
            metadata.clone(),
            notifier.clone(),
            false,
        )
        .process_runs()
        .await
        .unwrap();

        assert_eq!(report.runs_processed, 1);
        assert_eq!(report.files_attached, 1);
        assert_eq!(report.assay_names, vec!["Kinase Panel".to_string()]);

        let attached = vault.attached.lock().unwrap();
        assert_eq!(attached[0], (7, "Source - plate1.xlsx".to_string()));

        let fields = vault.field_writes.lock().unwrap();
        assert_eq!(fields[0].0, 7);
        assert_eq!(fields[0].1["data load processed"], true);

        let writes = metadata.writes.lock().unwrap();
        assert_eq!(writes[0].0, "g-1");
        assert_eq!(writes[0].1["status"], "Success");

        let calls = notifier.calls.lock().unwrap();
        assert_eq!(calls[0].0, "Pluto");
    }

    #[tokio::test]
    async fn test_processed_and_foreign_runs_skipped() {
        let vault = Arc::new(FakeVault::new(vec![ProtocolRuns {
            protocol_name: "Kinase Panel".to_string(),
            runs: vec![
                run(1, "Pluto", true, Some("corr-1")),
                run(2, "OtherProject", false, Some("corr-2")),
            ],
        }]));
        let files = Arc::new(FakeFiles { correlated: vec![] });
        let metadata = Arc::new(RecordingMetadata::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let report = processor(vault.clone(), files, metadata, notifier.clone(), false)
            .process_runs()
            .await
            .unwrap();

        assert_eq!(report.runs_seen, 2);
        assert_eq!(report.runs_processed, 0);
        assert!(vault.field_writes.lock().unwrap().is_empty());
        assert!(notifier.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_without_correlation_id_still_marked() {
        let vault = Arc::new(FakeVault::new(vec![ProtocolRuns {
            protocol_name: "Kinase Panel".to_string(),
            runs: vec![run(3, "Pluto", false, None)],
        }]));
        let files = Arc::new(FakeFiles { correlated: vec![] });
        let metadata = Arc::new(RecordingMetadata::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let report = processor(vault.clone(), files, metadata, notifier, false)
            .process_runs()
            .await
            .unwrap();

        assert_eq!(report.runs_processed, 1);
        assert_eq!(report.files_attached, 0);
        assert_eq!(vault.field_writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_mutates_nothing() {
        let vault = Arc::new(FakeVault::new(vec![ProtocolRuns {
            protocol_name: "Kinase Panel".to_string(),
            runs: vec![run(7, "Pluto", false, Some("corr-1"))],
        }]));
        let files = Arc::new(FakeFiles { correlated: vec![] });
        let metadata = Arc::new(RecordingMetadata::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let report = processor(vault.clone(), files, metadata, notifier.clone(), false)
            .with_lookback(Duration::hours(1))
            .process_runs()
            .await;
        assert!(report.is_ok());

        let vault2 = Arc::new(FakeVault::new(vec![ProtocolRuns {
            protocol_name: "Kinase Panel".to_string(),
            runs: vec![run(7, "Pluto", false, Some("corr-1"))],
        }]));
        let metadata2 = Arc::new(RecordingMetadata::default());
        let notifier2 = Arc::new(RecordingNotifier::default());
        let report = processor(
            vault2.clone(),
            Arc::new(FakeFiles { correlated: vec![] }),
            metadata2.clone(),
            notifier2.clone(),
            true,
        )
        .process_runs()
        .await
        .unwrap();

        assert_eq!(report.runs_processed, 0);
        assert!(vault2.field_writes.lock().unwrap().is_empty());
        assert!(vault2.attached.lock().unwrap().is_empty());
        assert!(metadata2.writes.lock().unwrap().is_empty());
        assert!(notifier2.calls.lock().unwrap().is_empty());
    }
}
