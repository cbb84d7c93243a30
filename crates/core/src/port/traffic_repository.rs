// Traffic Repository Port (Interface)

use crate::domain::TrafficRecord;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TrafficRepository: Send + Sync {
    /// Insert or replace the record for `record.url`
    async fn upsert(&self, record: &TrafficRecord) -> Result<()>;

    async fn find(&self, url: &str) -> Result<Option<TrafficRecord>>;

    /// URLs whose stored tag list contains `tag`
    async fn find_urls_by_tag(&self, tag: &str) -> Result<Vec<String>>;

    async fn delete(&self, url: &str) -> Result<bool>;

    async fn clear(&self) -> Result<u64>;

    async fn count(&self) -> Result<i64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::traffic::{decode_tags, TAG_DELIMITER};
    use crate::error::AppError;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Stores the encoded tag string like the SQL adapter does
    #[derive(Default)]
    pub struct InMemoryTrafficRepository {
        rows: Mutex<BTreeMap<String, String>>,
        unavailable: AtomicBool,
    }

    impl InMemoryTrafficRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::Database("traffic store unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TrafficRepository for InMemoryTrafficRepository {
        async fn upsert(&self, record: &TrafficRecord) -> Result<()> {
            self.check()?;
            self.rows
                .lock()
                .unwrap()
                .insert(record.url.clone(), record.encoded_tags());
            Ok(())
        }

        async fn find(&self, url: &str) -> Result<Option<TrafficRecord>> {
            self.check()?;
            Ok(self.rows.lock().unwrap().get(url).map(|tags| TrafficRecord {
                url: url.to_string(),
                tags: decode_tags(tags),
            }))
        }

        async fn find_urls_by_tag(&self, tag: &str) -> Result<Vec<String>> {
            self.check()?;
            let needle = format!("{d}{tag}{d}", d = TAG_DELIMITER, tag = tag);
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, tags)| tags.contains(&needle))
                .map(|(url, _)| url.clone())
                .collect())
        }

        async fn delete(&self, url: &str) -> Result<bool> {
            self.check()?;
            Ok(self.rows.lock().unwrap().remove(url).is_some())
        }

        async fn clear(&self) -> Result<u64> {
            self.check()?;
            let mut rows = self.rows.lock().unwrap();
            let removed = rows.len() as u64;
            rows.clear();
            Ok(removed)
        }

        async fn count(&self) -> Result<i64> {
            self.check()?;
            Ok(self.rows.lock().unwrap().len() as i64)
        }
    }
}
