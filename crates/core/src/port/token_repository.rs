// Token Repository Port (Interface)

use crate::domain::Token;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn insert(&self, token: &Token) -> Result<()>;

    async fn find(&self, value: &str) -> Result<Option<Token>>;

    /// Remove every token. Returns the number removed.
    async fn delete_all(&self) -> Result<u64>;

    /// Remove tokens created before `cutoff_millis`. Returns the number removed.
    async fn delete_older_than(&self, cutoff_millis: i64) -> Result<u64>;

    async fn count(&self) -> Result<i64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryTokenRepository {
        tokens: Mutex<HashMap<String, Token>>,
    }

    impl InMemoryTokenRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl TokenRepository for InMemoryTokenRepository {
        async fn insert(&self, token: &Token) -> Result<()> {
            self.tokens
                .lock()
                .unwrap()
                .insert(token.value.clone(), token.clone());
            Ok(())
        }

        async fn find(&self, value: &str) -> Result<Option<Token>> {
            Ok(self.tokens.lock().unwrap().get(value).cloned())
        }

        async fn delete_all(&self) -> Result<u64> {
            let mut tokens = self.tokens.lock().unwrap();
            let removed = tokens.len() as u64;
            tokens.clear();
            Ok(removed)
        }

        async fn delete_older_than(&self, cutoff_millis: i64) -> Result<u64> {
            let mut tokens = self.tokens.lock().unwrap();
            let before = tokens.len();
            tokens.retain(|_, t| t.created_at >= cutoff_millis);
            Ok((before - tokens.len()) as u64)
        }

        async fn count(&self) -> Result<i64> {
            Ok(self.tokens.lock().unwrap().len() as i64)
        }
    }
}
