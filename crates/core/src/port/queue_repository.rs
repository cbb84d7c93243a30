// Queue Repository Port (Interface)

use crate::domain::{NewQueueRecord, QueueRecord};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence for dedup queue records.
///
/// Every method is a single atomic statement; no caller needs a transaction.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert unless a record with the same payload hash already exists.
    ///
    /// Returns `false` (not an error) for duplicates.
    async fn insert_if_absent(&self, record: &NewQueueRecord) -> Result<bool>;

    /// Lease the oldest record of `queue` that is unclaimed or whose lease
    /// lapsed (`lease_expires_at <= now`), setting its lease to `lease_expires_at`.
    ///
    /// Must never hand the same record to two concurrent callers.
    async fn claim(
        &self,
        queue: &str,
        now_millis: i64,
        lease_expires_at: i64,
    ) -> Result<Option<QueueRecord>>;

    /// Delete a record (job finished). Returns whether it existed.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Reset a record's lease to unclaimed. Returns whether it existed.
    async fn release(&self, id: i64) -> Result<bool>;

    /// Look up a pending record by payload hash
    async fn find_by_hash(&self, payload_hash: &str) -> Result<Option<QueueRecord>>;

    /// Count records (claimed or not) in `queue`
    async fn count(&self, queue: &str) -> Result<i64>;

    /// Remove every record of `queue`. Returns the number removed.
    async fn clear(&self, queue: &str) -> Result<u64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory queue store with a switch to simulate an unavailable backend
    #[derive(Default)]
    pub struct InMemoryQueueRepository {
        records: Mutex<Vec<QueueRecord>>,
        next_id: Mutex<i64>,
        unavailable: AtomicBool,
    }

    impl InMemoryQueueRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        pub fn records(&self) -> Vec<QueueRecord> {
            self.records.lock().unwrap().clone()
        }

        fn check(&self) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::Database("queue store unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl QueueRepository for InMemoryQueueRepository {
        async fn insert_if_absent(&self, record: &NewQueueRecord) -> Result<bool> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            if records
                .iter()
                .any(|r| r.payload_hash == record.payload_hash)
            {
                return Ok(false);
            }
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            records.push(QueueRecord {
                id: *next_id,
                queue: record.queue.clone(),
                payload_hash: record.payload_hash.clone(),
                payload: record.payload.clone(),
                created_at: record.created_at,
                lease_expires_at: 0,
            });
            Ok(true)
        }

        async fn claim(
            &self,
            queue: &str,
            now_millis: i64,
            lease_expires_at: i64,
        ) -> Result<Option<QueueRecord>> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            let claimed = records
                .iter_mut()
                .filter(|r| r.queue == queue && r.lease_expires_at <= now_millis)
                .min_by_key(|r| r.id)
                .map(|r| {
                    r.lease_expires_at = lease_expires_at;
                    r.clone()
                });
            Ok(claimed)
        }

        async fn delete(&self, id: i64) -> Result<bool> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.id != id);
            Ok(records.len() != before)
        }

        async fn release(&self, id: i64) -> Result<bool> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            match records.iter_mut().find(|r| r.id == id) {
                Some(r) => {
                    r.lease_expires_at = 0;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn find_by_hash(&self, payload_hash: &str) -> Result<Option<QueueRecord>> {
            self.check()?;
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .find(|r| r.payload_hash == payload_hash)
                .cloned())
        }

        async fn count(&self, queue: &str) -> Result<i64> {
            self.check()?;
            let records = self.records.lock().unwrap();
            Ok(records.iter().filter(|r| r.queue == queue).count() as i64)
        }

        async fn clear(&self, queue: &str) -> Result<u64> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.queue != queue);
            Ok((before - records.len()) as u64)
        }
    }
}
