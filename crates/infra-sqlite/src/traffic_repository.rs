// SQLite TrafficRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use snapshot_core::domain::traffic::{decode_tags, TAG_DELIMITER};
use snapshot_core::domain::TrafficRecord;
use snapshot_core::error::Result;
use snapshot_core::port::TrafficRepository;
use sqlx::SqlitePool;

pub struct SqliteTrafficRepository {
    pool: SqlitePool,
}

impl SqliteTrafficRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// `LIKE` pattern matching `,tag,` anywhere in the stored list
fn tag_pattern(tag: &str) -> String {
    let mut escaped = String::with_capacity(tag.len() + 4);
    for c in tag.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{d}{tag}{d}%", d = TAG_DELIMITER, tag = escaped)
}

#[async_trait]
impl TrafficRepository for SqliteTrafficRepository {
    async fn upsert(&self, record: &TrafficRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO traffic (url, tags) VALUES (?, ?)
            ON CONFLICT(url) DO UPDATE SET tags = excluded.tags
            "#,
        )
        .bind(&record.url)
        .bind(record.encoded_tags())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find(&self, url: &str) -> Result<Option<TrafficRecord>> {
        let tags: Option<String> = sqlx::query_scalar("SELECT tags FROM traffic WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(tags.map(|tags| TrafficRecord {
            url: url.to_string(),
            tags: decode_tags(&tags),
        }))
    }

    async fn find_urls_by_tag(&self, tag: &str) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT url FROM traffic WHERE tags LIKE ? ESCAPE '\\' ORDER BY url")
            .bind(tag_pattern(tag))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM traffic WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM traffic")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM traffic")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}
