//! Durable event-stream cursor
//!
//! The cursor records the highest fully-processed event id across runs. The
//! backing store is append-only: one integer per line, last committed value
//! authoritative, so a crash mid-write never corrupts the previous entry.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

/// Append-only persistence for cursor values.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Last committed value, or `None` when no usable cursor exists.
    async fn load(&self) -> Result<Option<u64>>;

    /// Durably append a new value.
    async fn append(&self, id: u64) -> Result<()>;
}

/// Flat-file cursor store: one integer per line.
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn load(&self) -> Result<Option<u64>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SyncError::Cursor(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        // A torn trailing line must not win over an earlier committed value;
        // with a monotonic cursor the maximum parseable line is the last
        // fully-committed one.
        Ok(content
            .lines()
            .filter_map(|line| line.trim().parse::<u64>().ok())
            .max())
    }

    async fn append(&self, id: u64) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                SyncError::Cursor(format!("failed to open {}: {}", self.path.display(), e))
            })?;
        file.write_all(format!("{}\n", id).as_bytes())
            .await
            .map_err(|e| SyncError::Cursor(format!("failed to append cursor: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| SyncError::Cursor(format!("failed to flush cursor: {}", e)))?;
        Ok(())
    }
}

/// Durable pointer into the remote change-event stream.
pub struct EventCursor {
    store: Arc<dyn CursorStore>,
    committed: Option<u64>,
}

impl EventCursor {
    /// Load the cursor. An unreadable store is treated as "no cursor": the
    /// engine then falls back to the stream's current latest id, skipping
    /// backlog rather than reprocessing unknown volume.
    pub async fn load(store: Arc<dyn CursorStore>) -> Self {
        let committed = match store.load().await {
            Ok(value) => value,
            Err(e) => {
                warn!("cursor store unreadable, treating as no cursor: {}", e);
                None
            }
        };
        debug!(?committed, "loaded event cursor");
        Self { store, committed }
    }

    pub fn last(&self) -> Option<u64> {
        self.committed
    }

    /// Advance the cursor. Monotonic: moving backwards is rejected;
    /// re-advancing to the committed value is a no-op.
    pub async fn advance(&mut self, new_id: u64) -> Result<()> {
        if let Some(committed) = self.committed {
            if new_id < committed {
                return Err(SyncError::CursorRegression {
                    committed,
                    requested: new_id,
                });
            }
            if new_id == committed {
                return Ok(());
            }
        }
        self.store.append(new_id).await?;
        self.committed = Some(new_id);
        Ok(())
    }
}
