// SQLite QueueRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use snapshot_core::domain::{NewQueueRecord, QueueRecord};
use snapshot_core::error::Result;
use snapshot_core::port::QueueRepository;
use sqlx::SqlitePool;

pub struct SqliteQueueRepository {
    pool: SqlitePool,
}

impl SqliteQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueRepository for SqliteQueueRepository {
    async fn insert_if_absent(&self, record: &NewQueueRecord) -> Result<bool> {
        // The UNIQUE payload_hash makes a duplicate a no-op, not an error
        let result = sqlx::query(
            r#"
            INSERT INTO queue_items (queue, payload_hash, payload, created_at, lease_expires_at)
            VALUES (?, ?, ?, ?, 0)
            ON CONFLICT(payload_hash) DO NOTHING
            "#,
        )
        .bind(&record.queue)
        .bind(&record.payload_hash)
        .bind(&record.payload)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn claim(
        &self,
        queue: &str,
        now_millis: i64,
        lease_expires_at: i64,
    ) -> Result<Option<QueueRecord>> {
        // Single UPDATE ... RETURNING: select and lease happen atomically
        let row = sqlx::query_as::<_, QueueRow>(
            r#"
            UPDATE queue_items
            SET lease_expires_at = ?
            WHERE id = (
                SELECT id FROM queue_items
                WHERE queue = ? AND lease_expires_at <= ?
                ORDER BY id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(lease_expires_at)
        .bind(queue)
        .bind(now_millis)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(QueueRow::into_record))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM queue_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE queue_items SET lease_expires_at = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_hash(&self, payload_hash: &str) -> Result<Option<QueueRecord>> {
        let row = sqlx::query_as::<_, QueueRow>("SELECT * FROM queue_items WHERE payload_hash = ?")
            .bind(payload_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(QueueRow::into_record))
    }

    async fn count(&self, queue: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM queue_items WHERE queue = ?")
            .bind(queue)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn clear(&self, queue: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM queue_items WHERE queue = ?")
            .bind(queue)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: i64,
    queue: String,
    payload_hash: String,
    payload: String,
    created_at: i64,
    lease_expires_at: i64,
}

impl QueueRow {
    fn into_record(self) -> QueueRecord {
        QueueRecord {
            id: self.id,
            queue: self.queue,
            payload_hash: self.payload_hash,
            payload: self.payload,
            created_at: self.created_at,
            lease_expires_at: self.lease_expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use snapshot_core::domain::PublishJob;

    async fn setup_test_db() -> SqliteQueueRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteQueueRepository::new(pool)
    }

    fn record(queue: &str, route: &str) -> NewQueueRecord {
        NewQueueRecord::from_job(queue, &PublishJob::route(route), 1_000).unwrap()
    }

    #[tokio::test]
    async fn test_insert_if_absent() {
        let repo = setup_test_db().await;

        assert!(repo.insert_if_absent(&record("publish", "/a")).await.unwrap());
        assert!(!repo.insert_if_absent(&record("publish", "/a")).await.unwrap());
        assert!(repo.insert_if_absent(&record("other", "/a")).await.unwrap());
        assert_eq!(repo.count("publish").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_claim_oldest_and_lease() {
        let repo = setup_test_db().await;
        repo.insert_if_absent(&record("publish", "/a")).await.unwrap();
        repo.insert_if_absent(&record("publish", "/b")).await.unwrap();

        let first = repo.claim("publish", 1_000, 61_000).await.unwrap().unwrap();
        assert_eq!(first.decode().unwrap(), PublishJob::route("/a"));
        assert_eq!(first.lease_expires_at, 61_000);

        let second = repo.claim("publish", 1_000, 61_000).await.unwrap().unwrap();
        assert_eq!(second.decode().unwrap(), PublishJob::route("/b"));
        assert!(repo.claim("publish", 1_000, 61_000).await.unwrap().is_none());

        // Lease lapsed: the first record is handed out again
        let again = repo.claim("publish", 61_000, 121_000).await.unwrap().unwrap();
        assert_eq!(again.id, first.id);
    }

    #[tokio::test]
    async fn test_release_and_delete() {
        let repo = setup_test_db().await;
        repo.insert_if_absent(&record("publish", "/a")).await.unwrap();

        let claimed = repo.claim("publish", 0, 60_000).await.unwrap().unwrap();
        assert!(repo.release(claimed.id).await.unwrap());
        let reclaimed = repo.claim("publish", 0, 60_000).await.unwrap().unwrap();
        assert_eq!(reclaimed.id, claimed.id);

        assert!(repo.delete(claimed.id).await.unwrap());
        assert!(!repo.delete(claimed.id).await.unwrap());
        assert!(repo
            .find_by_hash(&claimed.payload_hash)
            .await
            .unwrap()
            .is_none());

        // Completed payloads may be enqueued again
        assert!(repo.insert_if_absent(&record("publish", "/a")).await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_is_scoped_to_queue() {
        let repo = setup_test_db().await;
        repo.insert_if_absent(&record("files", "/a")).await.unwrap();
        assert!(repo.claim("publish", 0, 60_000).await.unwrap().is_none());
        assert_eq!(repo.clear("files").await.unwrap(), 1);
    }
}
