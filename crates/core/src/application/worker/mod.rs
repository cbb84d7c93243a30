// Worker - claim / send / complete loop

pub mod constants;
mod panic_guard;
mod pool;
mod shutdown;

use constants::*;
use panic_guard::panic_message;
pub use pool::{WorkerPool, WorkerPoolHandle};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::dispatch::{JobContext, JobOutcome};
use crate::application::queue::DedupQueue;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Drains one queue. Workers share nothing; the queue's atomic claim is
/// the only coordination between them.
pub struct Worker {
    id: usize,
    queue_name: String,
    lease: Duration,
    queue: Arc<DedupQueue>,
    ctx: JobContext,
}

impl Worker {
    pub fn new(
        id: usize,
        queue_name: impl Into<String>,
        lease: Duration,
        queue: Arc<DedupQueue>,
        ctx: JobContext,
    ) -> Self {
        Self {
            id,
            queue_name: queue_name.into(),
            lease,
            queue,
            ctx,
        }
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(worker = self.id, queue = %self.queue_name, "Worker started");
        loop {
            if shutdown.is_shutdown() {
                info!(worker = self.id, "Worker shutting down");
                break;
            }
            match self.process_next_job().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = sleep(IDLE_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!(worker = self.id, "Worker interrupted during idle");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(worker = self.id, error = %e, "Worker error");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!(worker = self.id, "Worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!(worker = self.id, queue = %self.queue_name, "Worker stopped");
        Ok(())
    }

    /// Claim and execute one job. Returns false when the queue was empty.
    ///
    /// Only queue storage errors are returned; job failures are settled
    /// through the lease.
    pub async fn process_next_job(&self) -> Result<bool> {
        let claimed = match self.queue.claim(&self.queue_name, self.lease).await? {
            Some(claimed) => claimed,
            None => return Ok(false),
        };

        let job_id = claimed.id;
        info!(worker = self.id, job_id = job_id, "{}", claimed.job.log_line());

        // Run in a separate task so a panicking job cannot take the worker down
        let job = claimed.job.clone();
        let ctx = self.ctx.clone();
        let handle = tokio::task::spawn(async move { job.send(&ctx).await });

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) if join_err.is_panic() => {
                let message = panic_message(join_err.into_panic().as_ref());
                error!(job_id = job_id, panic_msg = %message, "Job panicked");
                JobOutcome::Abandoned(format!("panicked: {}", message))
            }
            Err(join_err) => {
                error!(job_id = job_id, error = %join_err, "Job cancelled");
                JobOutcome::Abandoned("cancelled".to_string())
            }
        };

        match outcome {
            JobOutcome::Completed => {
                self.queue.complete(job_id).await?;
                info!(job_id = job_id, job = %claimed.job.describe(), "Job completed");
            }
            JobOutcome::Discarded(reason) => {
                self.queue.complete(job_id).await?;
                error!(job_id = job_id, job = %claimed.job.describe(), reason = %reason, "Job discarded");
            }
            JobOutcome::Retry(reason) => {
                self.queue.release(job_id).await?;
                warn!(job_id = job_id, reason = %reason, "Job released for retry");
            }
            JobOutcome::Abandoned(reason) => {
                warn!(
                    job_id = job_id,
                    job = %claimed.job.describe(),
                    reason = %reason,
                    lease_expires_at = claimed.lease_expires_at,
                    "Job abandoned until lease expiry"
                );
            }
        }
        Ok(true)
    }
}
