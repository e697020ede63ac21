//! # Incremental Sync
//!
//! The pipeline core: consumes the remote change feed from a persisted
//! cursor, resolves per-folder processing configuration, ingests and
//! validates touched spreadsheets, uploads them to the vault grouped by
//! experimental run, and post-processes the resulting vault runs.
//!
//! ## Components
//!
//! - **Cursor** (`cursor`): append-only persisted event position
//! - **Folder Config** (`folder_config`): mapping-template resolution from
//!   parent-folder metadata
//! - **Caches** (`cache`): per-pass mapping template and protocol caches
//! - **Engine** (`engine`): the sync pass itself
//! - **Uploader** (`uploader`): run-key grouping, combined CSV submission,
//!   status write-back
//! - **Poller** (`poller`): wait-for-completion of remote slurp jobs
//! - **Runs** (`runs`): vault-run post-processing and notification
//! - **Report** (`report`): pass observer seam and the pass report

pub mod cache;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod folder_config;
pub mod metadata;
pub mod poller;
pub mod report;
pub mod runs;
pub mod uploader;

pub use cache::{ProtocolCache, TemplateCache};
pub use cursor::{CursorStore, EventCursor, FileCursorStore};
pub use engine::{ChangeSyncEngine, EngineOptions, DEFAULT_PAGE_SIZE};
pub use error::{Result, SyncError};
pub use folder_config::{FolderConfig, FolderConfigResolver};
pub use metadata::{FileStatus, DEFAULT_NAMESPACE};
pub use poller::{JobPoller, PollOutcome, DEFAULT_POLL_INTERVAL};
pub use report::{PassEvent, PassFailure, PassReport, SkipReason, SyncObserver, TracingObserver};
pub use runs::{RunPostProcessor, RunReport, DEFAULT_RUN_LOOKBACK_HOURS};
pub use uploader::{GroupOutcome, UploadOrchestrator};
