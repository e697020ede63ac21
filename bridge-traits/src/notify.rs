//! Outbound notification seam
//!
//! Run post-processing reports which assays produced new results. Payload
//! formatting (chat cards, email) lives behind this trait and outside the
//! pipeline.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce that new results are available for the named assays of a
    /// project. `assay_names` is sorted by the caller.
    async fn results_available(&self, project: &str, assay_names: &[String]) -> Result<()>;
}

/// Notifier that drops every announcement. Used in dry runs and tests.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn results_available(&self, _project: &str, _assay_names: &[String]) -> Result<()> {
        Ok(())
    }
}
