// Token Store - ephemeral trust tokens for internal render requests

use crate::config::TokenConfig;
use crate::domain::job::validate_route;
use crate::domain::{Token, ValidationResult};
use crate::error::Result;
use crate::port::{TimeProvider, TokenRepository};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Random bytes per token (43 characters once encoded)
const TOKEN_BYTES: usize = 32;

/// Issues and validates short-lived tokens proving that a render request
/// came from the publish pipeline.
///
/// The token is a cheap gate, not a security boundary: it keeps arbitrary
/// traffic from triggering registry side effects and rejects replays
/// outside the validity window.
pub struct TokenStore {
    repo: Arc<dyn TokenRepository>,
    time_provider: Arc<dyn TimeProvider>,
    config: TokenConfig,
}

impl TokenStore {
    pub fn new(
        repo: Arc<dyn TokenRepository>,
        time_provider: Arc<dyn TimeProvider>,
        config: TokenConfig,
    ) -> Self {
        Self {
            repo,
            time_provider,
            config,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Issue a token bound to `route`
    pub async fn issue(&self, route: &str) -> Result<String> {
        validate_route(route)?;
        self.issue_token(Some(route.to_string())).await
    }

    /// Issue a token without a route binding (redirect checks, HEAD requests)
    pub async fn issue_unbound(&self) -> Result<String> {
        self.issue_token(None).await
    }

    async fn issue_token(&self, subject_route: Option<String>) -> Result<String> {
        let token = Token {
            value: generate_value(),
            subject_route,
            created_at: self.time_provider.now_millis(),
        };
        self.repo.insert(&token).await?;
        debug!(route = ?token.subject_route, "Issued render token");
        Ok(token.value)
    }

    /// Validate against the configured strict window
    pub async fn validate(
        &self,
        value: &str,
        request_route: &str,
        strict: bool,
    ) -> Result<ValidationResult> {
        self.validate_within(value, request_route, strict, self.config.timeout)
            .await
    }

    /// Validate for the coarse internal-traffic gate (long window, no route binding)
    pub async fn validate_traffic(&self, value: &str, url: &str) -> Result<ValidationResult> {
        self.validate_within(value, url, false, self.config.traffic_timeout)
            .await
    }

    /// Non-strict validation still enforces expiry; only the route binding is skipped.
    pub async fn validate_within(
        &self,
        value: &str,
        request_route: &str,
        strict: bool,
        timeout: Duration,
    ) -> Result<ValidationResult> {
        if !self.config.enabled {
            return Ok(ValidationResult::Disabled);
        }

        let token = match self.repo.find(value).await? {
            Some(token) => token,
            None => {
                warn!(route = %request_route, "Render token not found");
                return Ok(ValidationResult::NotFound);
            }
        };

        let now = self.time_provider.now_millis();
        if now >= token.valid_until(timeout.as_millis() as i64) {
            warn!(
                route = %request_route,
                issued_at = token.created_at,
                now = now,
                "Render token expired"
            );
            return Ok(ValidationResult::Expired {
                issued_at: token.created_at,
                now,
            });
        }

        if strict {
            if let Some(token_route) = token.subject_route {
                if token_route != request_route {
                    warn!(
                        token_route = %token_route,
                        request_route = %request_route,
                        "Render token used on another route"
                    );
                    return Ok(ValidationResult::RouteMismatch {
                        token_route,
                        request_route: request_route.to_string(),
                    });
                }
            }
        }

        Ok(ValidationResult::Valid)
    }

    /// Invalidate every token
    pub async fn release(&self) -> Result<u64> {
        let removed = self.repo.delete_all().await?;
        info!(removed = removed, "Released all render tokens");
        Ok(removed)
    }

    /// Delete tokens that can no longer validate under any window
    pub async fn purge_expired(&self) -> Result<u64> {
        let retention_ms = self.config.retention().as_millis() as i64;
        let cutoff = self.time_provider.now_millis().saturating_sub(retention_ms);
        self.repo.delete_older_than(cutoff).await
    }

    pub async fn count(&self) -> Result<i64> {
        self.repo.count().await
    }
}

fn generate_value() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
