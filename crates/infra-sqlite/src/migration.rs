// Migration Runner

use crate::error::map_sqlx_error;
use snapshot_core::error::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    let table_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)?;

    let current_version: i64 = if table_exists > 0 {
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await
            .map_err(map_sqlx_error)?
            .unwrap_or(0)
    } else {
        0
    };

    info!("Current schema version: {}", current_version);

    if current_version < 1 {
        info!("Applying migration 001: Dedup queue");
        apply_migration(pool, include_str!("../migrations/001_queue.sql")).await?;
    }

    if current_version < 2 {
        info!("Applying migration 002: Render tokens");
        apply_migration(pool, include_str!("../migrations/002_tokens.sql")).await?;
    }

    if current_version < 3 {
        info!("Applying migration 003: Traffic registry");
        apply_migration(pool, include_str!("../migrations/003_traffic.sql")).await?;
    }

    info!("All migrations applied successfully");
    Ok(())
}

/// Apply one migration file in a transaction
async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    for statement in split_statements(sql) {
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
    }

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Strip `--` comments, then split on `;`.
///
/// Migrations must not put `--` or `;` inside string literals.
fn split_statements(sql: &str) -> Vec<String> {
    let without_comments = sql
        .lines()
        .map(|line| match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
