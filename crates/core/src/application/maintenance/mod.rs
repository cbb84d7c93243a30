// Token Maintenance - periodic purge of tokens that can no longer validate

use crate::application::token::TokenStore;
use crate::application::worker::ShutdownToken;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Default purge interval (1 hour)
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Keeps the token table bounded by deleting tokens older than the
/// longest validity window
pub struct MaintenanceScheduler {
    tokens: Arc<TokenStore>,
    every: Duration,
}

impl MaintenanceScheduler {
    pub fn new(tokens: Arc<TokenStore>, every: Duration) -> Self {
        Self { tokens, every }
    }

    /// Run maintenance loop (background task), until `shutdown` fires
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_secs = self.every.as_secs(),
            retention_secs = self.tokens.config().retention().as_secs(),
            "Maintenance scheduler started"
        );

        let mut tick = interval(self.every);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.run_now().await {
                        error!(error = %e, "Scheduled token purge failed");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Maintenance scheduler stopped");
                    break;
                }
            }
        }
    }

    /// Purge immediately (manual trigger); returns the number of tokens removed
    pub async fn run_now(&self) -> Result<u64> {
        let purged = self.tokens.purge_expired().await?;
        if purged > 0 {
            info!(purged = purged, "Purged expired render tokens");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::worker::shutdown_channel;
    use crate::config::TokenConfig;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use crate::port::token_repository::mocks::InMemoryTokenRepository;

    fn store(clock: Arc<ManualTimeProvider>) -> Arc<TokenStore> {
        Arc::new(TokenStore::new(
            Arc::new(InMemoryTokenRepository::new()),
            clock,
            TokenConfig {
                enabled: true,
                timeout: Duration::from_secs(60),
                traffic_timeout: Duration::from_secs(120),
            },
        ))
    }

    #[tokio::test]
    async fn test_run_now_purges_beyond_retention() {
        let clock = Arc::new(ManualTimeProvider::new(0));
        let tokens = store(clock.clone());
        tokens.issue("/a").await.unwrap();
        clock.advance(120_001);
        tokens.issue("/b").await.unwrap();

        let scheduler = MaintenanceScheduler::new(tokens.clone(), DEFAULT_PURGE_INTERVAL);
        assert_eq!(scheduler.run_now().await.unwrap(), 1);
        assert_eq!(tokens.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_scheduler_purges_on_first_tick_and_stops() {
        let clock = Arc::new(ManualTimeProvider::new(0));
        let tokens = store(clock.clone());
        tokens.issue("/a").await.unwrap();
        clock.advance(200_000);

        let (sender, token) = shutdown_channel();
        let scheduler = MaintenanceScheduler::new(tokens.clone(), DEFAULT_PURGE_INTERVAL);
        let handle = tokio::spawn(scheduler.run(token));

        tokio::time::timeout(Duration::from_secs(5), async {
            while tokens.count().await.unwrap() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        sender.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
