// sqlx::Error -> AppError with SQLite result codes kept in the message

use snapshot_core::error::AppError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "2067" | "1555" => AppError::Database(format!(
                    "Unique constraint violation: {} ({})",
                    db_err.message(),
                    code
                )),
                "5" | "517" => AppError::Database(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                other => AppError::Database(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            },
            None => AppError::Database(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        // Connection, pool, protocol errors
        _ => AppError::Database(err.to_string()),
    }
}
