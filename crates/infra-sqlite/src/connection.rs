// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use snapshot_core::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 10;

/// Create SQLite connection pool with WAL mode.
///
/// In-memory databases are private to one connection, so they get a single
/// connection that is never recycled.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    let mut options = SqliteConnectOptions::from_str(database_url)
        .map_err(map_sqlx_error)?
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
    };

    pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_pool_keeps_state() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE t (x INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
