// Origin Render Port
// The origin application renders routes on behalf of the publisher

use crate::config::BasicAuth;
use crate::port::transport::TransportError;
use async_trait::async_trait;
use std::time::Duration;

/// Header carrying the trust token on internal render requests
pub const TOKEN_HEADER: &str = "x-snapshot-token";

/// Query parameter selecting a specific revision
pub const REVISION_PARAM: &str = "snapshot_revision";

/// Internal render request (always sent as POST so the origin can tell
/// publish-triggered renders apart from ordinary browsing)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub path: String,
    pub token: String,
    pub revision_id: Option<String>,
    /// Host header override for virtual hosting
    pub host: Option<String>,
    pub basic_auth: Option<BasicAuth>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: String,
}

impl RenderResponse {
    pub fn ok(body: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.into()),
            location: None,
            body: body.into(),
        }
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            content_type: None,
            location: Some(location.into()),
            body: String::new(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            location: None,
            body: String::new(),
        }
    }
}

#[async_trait]
pub trait OriginClient: Send + Sync {
    /// Perform the render request.
    ///
    /// # Errors
    /// Only connectivity problems are errors; any HTTP status is a response.
    async fn render(&self, request: &RenderRequest) -> Result<RenderResponse, TransportError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Origin answering from a fixed route table; unknown routes get 404
    #[derive(Default)]
    pub struct ScriptedOrigin {
        responses: Mutex<HashMap<String, Result<RenderResponse, TransportError>>>,
        requests: Mutex<Vec<RenderRequest>>,
    }

    impl ScriptedOrigin {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, path: impl Into<String>, response: RenderResponse) {
            self.responses
                .lock()
                .unwrap()
                .insert(path.into(), Ok(response));
        }

        pub fn fail(&self, path: impl Into<String>, error: TransportError) {
            self.responses
                .lock()
                .unwrap()
                .insert(path.into(), Err(error));
        }

        pub fn requests(&self) -> Vec<RenderRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OriginClient for ScriptedOrigin {
        async fn render(&self, request: &RenderRequest) -> Result<RenderResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .get(&request.path)
                .cloned()
                .unwrap_or_else(|| Ok(RenderResponse::status(404)))
        }
    }
}
