//! Remote-job polling
//!
//! Generic wait-for-completion primitive shared by every asynchronous remote
//! job the pipeline drives. Fixed interval, no backoff: job durations are
//! minutes-scale and a status poll is cheap, so a constant small delay keeps
//! the code and the observed load predictable.

use bridge_traits::vault::SlurpJob;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Terminal result of a polling wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job reached its success state.
    Completed(SlurpJob),
    /// A cancellation was requested; the remote job was asked to stop.
    Cancelled,
}

pub struct JobPoller {
    interval: Duration,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl JobPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Poll `fetch` until the job leaves its in-progress states.
    ///
    /// Success returns the final job; any other terminal state raises
    /// `JobFailed` carrying the observed state. The cancellation token is
    /// checked once per iteration: on cancellation, `cancel_job` is invoked
    /// best-effort and the wait resolves to `PollOutcome::Cancelled` instead
    /// of propagating the interruption.
    pub async fn wait<F, Fut, C, CFut>(
        &self,
        slurp_id: u64,
        fetch: F,
        cancel_job: C,
        token: &CancellationToken,
    ) -> Result<PollOutcome>
    where
        F: Fn(u64) -> Fut,
        Fut: Future<Output = bridge_traits::Result<SlurpJob>>,
        C: Fn(u64) -> CFut,
        CFut: Future<Output = bridge_traits::Result<()>>,
    {
        loop {
            if token.is_cancelled() {
                if let Err(e) = cancel_job(slurp_id).await {
                    warn!(slurp_id, "remote cancel failed: {}", e);
                }
                return Ok(PollOutcome::Cancelled);
            }

            let job = fetch(slurp_id).await?;
            debug!(slurp_id, state = %job.state, "polled job");

            if job.state.is_in_progress() {
                tokio::time::sleep(self.interval).await;
                continue;
            }

            if job.state == bridge_traits::vault::SlurpState::Finished {
                return Ok(PollOutcome::Completed(job));
            }

            return Err(SyncError::JobFailed {
                slurp_id,
                state: job.state,
            });
        }
    }
}
