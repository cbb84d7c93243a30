// Trust Token Domain Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issued credential attached to an internal render request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    /// Route the token was issued for; unbound tokens skip strict route checks
    pub subject_route: Option<String>,
    pub created_at: i64, // epoch ms
}

impl Token {
    /// First instant (epoch ms) at which the token is no longer accepted
    pub fn valid_until(&self, timeout_ms: i64) -> i64 {
        self.created_at.saturating_add(timeout_ms)
    }
}

/// Outcome of validating an inbound token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    /// Validation switched off by configuration; callers pass the request through
    Disabled,
    Expired { issued_at: i64, now: i64 },
    RouteMismatch {
        token_route: String,
        request_route: String,
    },
    NotFound,
}

impl ValidationResult {
    /// Whether the request may proceed
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Valid | ValidationResult::Disabled)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationResult::Valid => write!(f, "valid"),
            ValidationResult::Disabled => write!(f, "validation disabled"),
            ValidationResult::Expired { issued_at, now } => {
                write!(f, "token expired (issued at {}, now {})", issued_at, now)
            }
            ValidationResult::RouteMismatch {
                token_route,
                request_route,
            } => write!(
                f,
                "token issued for {} used on {}",
                token_route, request_route
            ),
            ValidationResult::NotFound => write!(f, "token not found"),
        }
    }
}
