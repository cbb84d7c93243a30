// Remote Publish Transport Port
// Abstraction over the artifact/CDN service that receives snapshots

use crate::domain::{PublishEvent, RedirectEvent};
use async_trait::async_trait;
use thiserror::Error;

/// Failures talking to the origin or to the remote transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Remote publish transport
///
/// Every call must be safe to repeat: queue delivery is at-least-once.
#[async_trait]
pub trait PublishTransport: Send + Sync {
    /// Store or overwrite the snapshot for `event.route`
    async fn publish(&self, event: &PublishEvent) -> Result<(), TransportError>;

    /// Store or overwrite a redirect
    async fn redirect(&self, event: &RedirectEvent) -> Result<(), TransportError>;

    /// Remove whatever is published at `route`
    async fn unpublish(&self, route: &str) -> Result<(), TransportError>;

    /// Upload a static file, `path` relative to the files root
    async fn send_file(&self, path: &str) -> Result<(), TransportError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Call observed by the recording transport
    #[derive(Debug, Clone, PartialEq)]
    pub enum TransportCall {
        Publish(PublishEvent),
        Redirect(RedirectEvent),
        Unpublish(String),
        File(String),
    }

    /// Transport that records every call and can be told to fail
    #[derive(Default)]
    pub struct RecordingTransport {
        calls: Arc<Mutex<Vec<TransportCall>>>,
        failure: Arc<Mutex<Option<TransportError>>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn new_failing(error: TransportError) -> Self {
            let transport = Self::default();
            transport.fail_with(Some(error));
            transport
        }

        pub fn fail_with(&self, error: Option<TransportError>) {
            *self.failure.lock().unwrap() = error;
        }

        pub fn calls(&self) -> Vec<TransportCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn published(&self) -> Vec<PublishEvent> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    TransportCall::Publish(e) => Some(e),
                    _ => None,
                })
                .collect()
        }

        pub fn redirects(&self) -> Vec<RedirectEvent> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    TransportCall::Redirect(e) => Some(e),
                    _ => None,
                })
                .collect()
        }

        pub fn unpublished(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    TransportCall::Unpublish(route) => Some(route),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: TransportCall) -> Result<(), TransportError> {
            if let Some(err) = self.failure.lock().unwrap().clone() {
                return Err(err);
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl PublishTransport for RecordingTransport {
        async fn publish(&self, event: &PublishEvent) -> Result<(), TransportError> {
            self.record(TransportCall::Publish(event.clone()))
        }

        async fn redirect(&self, event: &RedirectEvent) -> Result<(), TransportError> {
            self.record(TransportCall::Redirect(event.clone()))
        }

        async fn unpublish(&self, route: &str) -> Result<(), TransportError> {
            self.record(TransportCall::Unpublish(route.to_string()))
        }

        async fn send_file(&self, path: &str) -> Result<(), TransportError> {
            self.record(TransportCall::File(path.to_string()))
        }
    }
}
