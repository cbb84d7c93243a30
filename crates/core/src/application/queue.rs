// Dedup Queue - content-addressed work queue with lease-based claims

use crate::domain::queue::validate_queue_name;
use crate::domain::{payload_hash, ClaimedJob, NewQueueRecord, PublishJob};
use crate::error::Result;
use crate::port::{QueueRepository, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Persistent FIFO-ish queue guaranteeing at most one pending record per
/// distinct `(queue, payload)` and at-least-once delivery to workers.
pub struct DedupQueue {
    repo: Arc<dyn QueueRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl DedupQueue {
    pub fn new(repo: Arc<dyn QueueRepository>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            repo,
            time_provider,
        }
    }

    /// Enqueue a job.
    ///
    /// Returns `false` when an identical job is already pending in `queue`;
    /// duplicates are not an error.
    pub async fn enqueue(&self, queue: &str, job: &PublishJob) -> Result<bool> {
        validate_queue_name(queue)?;
        job.validate()?;

        let now = self.time_provider.now_millis();
        let record = NewQueueRecord::from_job(queue, job, now)?;
        let inserted = self.repo.insert_if_absent(&record).await?;

        if inserted {
            debug!(queue = %queue, hash = %record.payload_hash, job = %job.describe(), "Job enqueued");
        } else {
            debug!(queue = %queue, hash = %record.payload_hash, job = %job.describe(), "Duplicate job ignored");
        }
        Ok(inserted)
    }

    /// Whether an identical job is currently pending (claimed or not)
    pub async fn is_pending(&self, queue: &str, job: &PublishJob) -> Result<bool> {
        validate_queue_name(queue)?;
        let payload = serde_json::to_string(job)?;
        let hash = payload_hash(queue, &payload);
        Ok(self.repo.find_by_hash(&hash).await?.is_some())
    }

    /// Lease one unclaimed (or lease-expired) job for `lease`.
    ///
    /// Records whose payload no longer decodes are dropped so they cannot
    /// block the queue forever.
    pub async fn claim(&self, queue: &str, lease: Duration) -> Result<Option<ClaimedJob>> {
        loop {
            let now = self.time_provider.now_millis();
            let lease_expires_at = now.saturating_add(lease.as_millis() as i64);

            let record = match self.repo.claim(queue, now, lease_expires_at).await? {
                Some(record) => record,
                None => return Ok(None),
            };

            match record.decode() {
                Ok(job) => {
                    return Ok(Some(ClaimedJob {
                        id: record.id,
                        job,
                        lease_expires_at,
                    }))
                }
                Err(e) => {
                    error!(
                        record_id = record.id,
                        hash = %record.payload_hash,
                        error = %e,
                        "Dropping undecodable queue record"
                    );
                    self.repo.delete(record.id).await?;
                }
            }
        }
    }

    /// Delete a finished job's record
    pub async fn complete(&self, id: i64) -> Result<bool> {
        self.repo.delete(id).await
    }

    /// Give up a lease early so another worker can retry sooner
    pub async fn release(&self, id: i64) -> Result<bool> {
        self.repo.release(id).await
    }

    pub async fn size(&self, queue: &str) -> Result<i64> {
        self.repo.count(queue).await
    }

    pub async fn clear(&self, queue: &str) -> Result<u64> {
        self.repo.clear(queue).await
    }
}
