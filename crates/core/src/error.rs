// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Backing store unavailable or rejected the operation (retryable)
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Trust token missing, expired or bound to another route
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::port::TransportError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Storage failures may succeed on a later attempt; everything else will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Transport(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
