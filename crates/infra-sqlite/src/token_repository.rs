// SQLite TokenRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use snapshot_core::domain::Token;
use snapshot_core::error::Result;
use snapshot_core::port::TokenRepository;
use sqlx::SqlitePool;

pub struct SqliteTokenRepository {
    pool: SqlitePool,
}

impl SqliteTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    async fn insert(&self, token: &Token) -> Result<()> {
        sqlx::query("INSERT INTO tokens (value, subject_route, created_at) VALUES (?, ?, ?)")
            .bind(&token.value)
            .bind(&token.subject_route)
            .bind(token.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find(&self, value: &str) -> Result<Option<Token>> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT value, subject_route, created_at FROM tokens WHERE value = ?",
        )
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(|r| Token {
            value: r.value,
            subject_route: r.subject_route,
            created_at: r.created_at,
        }))
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tokens")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_older_than(&self, cutoff_millis: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tokens WHERE created_at < ?")
            .bind(cutoff_millis)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tokens")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    value: String,
    subject_route: Option<String>,
    created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn setup_test_db() -> SqliteTokenRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteTokenRepository::new(pool)
    }

    fn token(value: &str, route: Option<&str>, created_at: i64) -> Token {
        Token {
            value: value.to_string(),
            subject_route: route.map(str::to_string),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = setup_test_db().await;
        repo.insert(&token("abc", Some("/a"), 10)).await.unwrap();
        repo.insert(&token("unbound", None, 10)).await.unwrap();

        assert_eq!(
            repo.find("abc").await.unwrap(),
            Some(token("abc", Some("/a"), 10))
        );
        assert_eq!(repo.find("unbound").await.unwrap().unwrap().subject_route, None);
        assert!(repo.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_value_rejected() {
        let repo = setup_test_db().await;
        repo.insert(&token("abc", None, 10)).await.unwrap();
        let err = repo.insert(&token("abc", None, 11)).await.unwrap_err();
        assert!(err.to_string().contains("Unique constraint"));
    }

    #[tokio::test]
    async fn test_delete_older_than_and_all() {
        let repo = setup_test_db().await;
        repo.insert(&token("old", None, 10)).await.unwrap();
        repo.insert(&token("new", None, 20)).await.unwrap();

        assert_eq!(repo.delete_older_than(20).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.delete_all().await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
