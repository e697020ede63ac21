//! Incremental sync pass
//!
//! One pass drains the change feed from the committed cursor, resolves and
//! validates the touched files, hands them to the upload orchestrator
//! grouped by mapping template, and commits the cursor only after the whole
//! window has been attempted. Per-file failures are recorded and skipped;
//! nothing short of a feed/cursor error aborts the pass.

use bridge_traits::events::{ChangeEvent, ChangeFeed};
use bridge_traits::storage::{FileEntry, MetadataStore};
use bridge_traits::vault::VaultGateway;
use core_ingest::SpreadsheetIngestor;
use core_validate::{AssayRunFile, RunValidator};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::{ProtocolCache, TemplateCache};
use crate::cursor::EventCursor;
use crate::error::{Result, SyncError};
use crate::folder_config::FolderConfigResolver;
use crate::metadata::LOADED_ENTRY_ID_KEY;
use crate::report::{PassEvent, PassReport, SkipReason, SyncObserver};
use crate::uploader::UploadOrchestrator;

/// Events fetched per feed request.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Feed scope; only events under this folder are consumed.
    pub base_folder: String,
    /// Custom-metadata namespace holding pipeline state.
    pub namespace: String,
    pub page_size: u32,
    /// Observe and validate without committing the cursor; paired with a
    /// dry-run uploader, a pass leaves no durable trace and the next real
    /// pass replays the same window.
    pub dry_run: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            base_folder: "/".to_string(),
            namespace: crate::metadata::DEFAULT_NAMESPACE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            dry_run: false,
        }
    }
}

pub struct ChangeSyncEngine {
    feed: Arc<dyn ChangeFeed>,
    metadata: Arc<dyn MetadataStore>,
    ingestor: SpreadsheetIngestor,
    validator: RunValidator,
    templates: TemplateCache,
    protocols: ProtocolCache,
    resolver: FolderConfigResolver,
    uploader: UploadOrchestrator,
    cursor: EventCursor,
    observer: Arc<dyn SyncObserver>,
    options: EngineOptions,
}

impl ChangeSyncEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feed: Arc<dyn ChangeFeed>,
        metadata: Arc<dyn MetadataStore>,
        vault: Arc<dyn VaultGateway>,
        ingestor: SpreadsheetIngestor,
        uploader: UploadOrchestrator,
        cursor: EventCursor,
        observer: Arc<dyn SyncObserver>,
        options: EngineOptions,
    ) -> Self {
        let resolver = FolderConfigResolver::new(metadata.clone(), options.namespace.clone());
        Self {
            feed,
            metadata,
            ingestor,
            validator: RunValidator::new(),
            templates: TemplateCache::new(vault.clone()),
            protocols: ProtocolCache::new(vault),
            resolver,
            uploader,
            cursor,
            observer,
            options,
        }
    }

    /// Last event id committed to the cursor.
    pub fn committed_event_id(&self) -> Option<u64> {
        self.cursor.last()
    }

    /// Run one sync pass.
    ///
    /// The cursor is committed to the highest observed event id only when
    /// the pass reaches the end of the window uncancelled, so an
    /// interrupted pass replays its window. Per-file problems never abort
    /// the pass; they are itemized on the returned report.
    #[instrument(skip(self, token), fields(base_folder = %self.options.base_folder))]
    pub async fn run_pass(&mut self, token: &CancellationToken) -> Result<PassReport> {
        let mut report = PassReport::default();

        let since = self.starting_event_id().await?;
        let (by_path, through) = self.collect_events(since, &mut report, token).await?;

        info!(
            events = report.events_seen,
            files = by_path.len(),
            "change window collected"
        );

        // Batches keyed by mapping template id, deterministic order.
        let mut batches: BTreeMap<String, Vec<AssayRunFile>> = BTreeMap::new();

        for (path, _event) in by_path {
            if token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            report.files_considered += 1;

            let Some(entry) = self.lookup_entry(&path, &mut report).await else {
                continue;
            };

            let Some(mapping_template_id) = self
                .resolver
                .resolve(&path)
                .await
                .and_then(|config| config.mapping_template_id)
            else {
                self.skip(&mut report, &path, SkipReason::NotConfigured);
                continue;
            };

            let loaded = entry.metadata_str(&self.options.namespace, LOADED_ENTRY_ID_KEY);
            if loaded == Some(entry.entry_id.as_str()) {
                self.skip(&mut report, &path, SkipReason::AlreadyLoaded);
                continue;
            }

            let mut file = match self.ingestor.ingest(&entry).await {
                Ok(file) => file,
                Err(e) => {
                    self.fail(&mut report, &path, e.to_string());
                    continue;
                }
            };

            let template = match self.templates.get(&mapping_template_id).await {
                Ok(template) => template,
                Err(e) => {
                    self.fail(&mut report, &path, e.to_string());
                    continue;
                }
            };
            let protocols = match self.protocols.for_template(template).await {
                Ok(protocols) => protocols,
                Err(e) => {
                    self.fail(&mut report, &path, e.to_string());
                    continue;
                }
            };

            if let Err(e) = self.validator.validate(&mut file, template, &protocols) {
                self.fail(&mut report, &path, e.to_string());
                continue;
            }

            report.files_ingested += 1;
            self.observer
                .observe(&PassEvent::FileIngested { path: path.clone() });
            batches
                .entry(mapping_template_id)
                .or_default()
                .push(file);
        }

        for (mapping_template_id, files) in batches {
            let outcomes = self.uploader.upload(&mapping_template_id, files, token).await?;
            for outcome in outcomes {
                if let Some(message) = outcome.error {
                    let scope = format!("{}/{}", mapping_template_id, outcome.run_key);
                    self.fail(&mut report, &scope, message);
                } else if let Some(slurp_id) = outcome.slurp_id {
                    report.groups_submitted += 1;
                    self.observer.observe(&PassEvent::GroupSubmitted {
                        mapping_template_id: mapping_template_id.clone(),
                        run_key: outcome.run_key,
                        slurp_id,
                        files: outcome.files,
                    });
                }
            }
        }

        if let Some(through_id) = through {
            if token.is_cancelled() {
                // Leave the cursor where it was: an interrupted window is
                // replayed and the loaded-entry-id gate deduplicates.
                return Err(SyncError::Cancelled);
            }
            if self.options.dry_run {
                info!(through_id, "dry run: cursor not advanced");
            } else {
                self.cursor.advance(through_id).await?;
            }
            report.through_event_id = Some(through_id);
        }

        Ok(report)
    }

    /// Establish the `since` id for this pass: the committed cursor, clamped
    /// to the feed's retention; on a first run, the feed's current head
    /// (backlog of unknown size is skipped, never replayed).
    async fn starting_event_id(&mut self) -> Result<u64> {
        match self.cursor.last() {
            Some(committed) => {
                let oldest = self.feed.oldest_event_id(&self.options.base_folder).await?;
                if committed < oldest.saturating_sub(1) {
                    warn!(
                        committed,
                        oldest_retained = oldest,
                        "cursor predates feed retention, resuming from oldest retained event"
                    );
                    self.observer.observe(&PassEvent::CursorGap {
                        committed,
                        oldest_retained: oldest,
                    });
                    Ok(oldest.saturating_sub(1))
                } else {
                    Ok(committed)
                }
            }
            None => {
                // First run: commit the head immediately so the backlog is
                // skipped exactly once and later passes resume from here. A
                // dry run never initializes the cursor.
                let latest = self.feed.latest_event_id(&self.options.base_folder).await?;
                info!(latest, "no committed cursor, starting at the feed head");
                if !self.options.dry_run {
                    self.cursor.advance(latest).await?;
                }
                Ok(latest)
            }
        }
    }

    /// Page through the feed from `since` until the feed's reported latest
    /// event id is reached or a page comes back empty, deduplicating by path
    /// and keeping the newest event per path. Returns the deduplicated
    /// window and the highest observed event id.
    async fn collect_events(
        &self,
        since: u64,
        report: &mut PassReport,
        token: &CancellationToken,
    ) -> Result<(BTreeMap<String, ChangeEvent>, Option<u64>)> {
        let mut by_path: BTreeMap<String, ChangeEvent> = BTreeMap::new();
        let mut since_id = since;

        if token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let latest = self.feed.latest_event_id(&self.options.base_folder).await?;

        while since_id < latest {
            if token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let events = self
                .feed
                .list_events(&self.options.base_folder, since_id, self.options.page_size)
                .await?;
            if events.is_empty() {
                break;
            }

            let page_len = events.len();
            let page_max = events.iter().map(|e| e.id).max().unwrap_or(since_id);
            report.events_seen += page_len;
            self.observer.observe(&PassEvent::EventsFetched {
                count: page_len,
                through_id: page_max,
            });

            for event in events {
                if !event.action.is_ingestible() || event.is_folder {
                    debug!(event_id = event.id, path = %event.target_path, "event not ingestible");
                    continue;
                }
                match by_path.get(&event.target_path) {
                    Some(existing) if existing.id >= event.id => {}
                    _ => {
                        by_path.insert(event.target_path.clone(), event);
                    }
                }
            }

            // A page that makes no forward progress would loop forever.
            if page_max <= since_id {
                break;
            }
            since_id = page_max;
        }

        let through = (since_id > since).then_some(since_id);
        Ok((by_path, through))
    }

    /// Fetch the file entry behind a change event. Absence is a skip, a
    /// transport error is an itemized failure.
    async fn lookup_entry(&self, path: &str, report: &mut PassReport) -> Option<FileEntry> {
        match self.metadata.get_metadata(path).await {
            Ok(Some(entry)) => Some(entry),
            Ok(None) => {
                self.skip(report, path, SkipReason::MetadataUnavailable);
                None
            }
            Err(e) if e.is_not_found() => {
                self.skip(report, path, SkipReason::MetadataUnavailable);
                None
            }
            Err(e) => {
                self.fail(report, path, e.to_string());
                None
            }
        }
    }

    fn skip(&self, report: &mut PassReport, path: &str, reason: SkipReason) {
        report.files_skipped += 1;
        self.observer.observe(&PassEvent::FileSkipped {
            path: path.to_string(),
            reason,
        });
    }

    fn fail(&self, report: &mut PassReport, scope: &str, message: String) {
        warn!(scope, "{}", message);
        self.observer.observe(&PassEvent::Failure {
            scope: scope.to_string(),
            message: message.clone(),
        });
        report.record_failure(scope, message);
    }
}
