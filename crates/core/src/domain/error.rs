// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Invalid queue name: {0}")]
    InvalidQueueName(String),

    #[error("Invalid redirect status code: {0}")]
    InvalidStatusCode(u16),

    #[error("Invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
