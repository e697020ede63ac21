//! Pass reporting and observation
//!
//! The engine reports progress through an injected observer instead of a
//! process-wide logger, and returns an owned `PassReport` accumulator from
//! every pass. Failures are itemized: a pass that advanced as far as it
//! could with some files failing is partial success, not an error.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Why a file was skipped rather than ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry no longer exists (or its metadata is gone).
    MetadataUnavailable,
    /// No mapping template configured on the parent folder.
    NotConfigured,
    /// The file's current entry id was already loaded.
    AlreadyLoaded,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MetadataUnavailable => "metadata unavailable",
            SkipReason::NotConfigured => "not configured",
            SkipReason::AlreadyLoaded => "already loaded",
        }
    }
}

/// Structured events emitted during a sync pass.
#[derive(Debug, Clone)]
pub enum PassEvent {
    CursorGap { committed: u64, oldest_retained: u64 },
    EventsFetched { count: usize, through_id: u64 },
    FileSkipped { path: String, reason: SkipReason },
    FileIngested { path: String },
    GroupSubmitted { mapping_template_id: String, run_key: String, slurp_id: u64, files: usize },
    Failure { scope: String, message: String },
}

/// Injected pass observer. Implementations must be cheap: the engine calls
/// this inline on the pipeline path.
pub trait SyncObserver: Send + Sync {
    fn observe(&self, event: &PassEvent);

    /// Failures observed so far, across passes.
    fn error_count(&self) -> usize;
}

/// Production observer: forwards events to `tracing` and counts failures.
#[derive(Debug, Default)]
pub struct TracingObserver {
    errors: AtomicUsize,
}

impl SyncObserver for TracingObserver {
    fn observe(&self, event: &PassEvent) {
        match event {
            PassEvent::CursorGap {
                committed,
                oldest_retained,
            } => warn!(
                committed,
                oldest_retained, "cursor behind retained window, resuming from oldest event"
            ),
            PassEvent::EventsFetched { count, through_id } => {
                info!(count, through_id, "fetched change events")
            }
            PassEvent::FileSkipped { path, reason } => {
                debug!(path = %path, reason = reason.as_str(), "skipped file")
            }
            PassEvent::FileIngested { path } => debug!(path = %path, "ingested file"),
            PassEvent::GroupSubmitted {
                mapping_template_id,
                run_key,
                slurp_id,
                files,
            } => info!(
                mapping_template_id = %mapping_template_id,
                run_key = %run_key,
                slurp_id,
                files,
                "submitted group"
            ),
            PassEvent::Failure { scope, message } => {
                self.errors.fetch_add(1, Ordering::SeqCst);
                warn!(scope = %scope, "pass failure: {}", message);
            }
        }
    }

    fn error_count(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

/// One itemized failure from a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassFailure {
    /// File path or `template/run_key` the failure is attached to.
    pub scope: String,
    pub message: String,
}

/// Owned accumulator for one sync pass.
#[derive(Debug, Default, Clone)]
pub struct PassReport {
    pub events_seen: usize,
    pub files_considered: usize,
    pub files_skipped: usize,
    pub files_ingested: usize,
    pub groups_submitted: usize,
    pub failures: Vec<PassFailure>,
    /// Highest event id observed; the cursor was advanced to it.
    pub through_event_id: Option<u64>,
}

impl PassReport {
    pub fn record_failure(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.failures.push(PassFailure {
            scope: scope.into(),
            message: message.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_counts_failures_only() {
        let observer = TracingObserver::default();
        observer.observe(&PassEvent::FileIngested {
            path: "/a.csv".into(),
        });
        observer.observe(&PassEvent::Failure {
            scope: "/a.csv".into(),
            message: "boom".into(),
        });
        observer.observe(&PassEvent::Failure {
            scope: "/b.csv".into(),
            message: "boom".into(),
        });
        assert_eq!(observer.error_count(), 2);
    }

    #[test]
    fn test_report_cleanliness() {
        let mut report = PassReport::default();
        assert!(report.is_clean());
        report.record_failure("/a.csv", "parse error");
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].scope, "/a.csv");
    }
}
