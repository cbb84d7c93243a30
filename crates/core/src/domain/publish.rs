// Publish Outcome & Event Model

use serde::{Deserialize, Serialize};

/// Metadata attached to a published snapshot
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Classification of one render attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    Published {
        markup: String,
        content_type: Option<String>,
    },
    Redirected {
        destination: String,
        status_code: u16,
    },
    Unpublished,
    Failed {
        reason: String,
    },
}

impl PublishResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        PublishResult::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PublishResult::Failed { .. })
    }

    /// Terminal state label
    pub fn state(&self) -> &'static str {
        match self {
            PublishResult::Published { .. } => "PUBLISHED",
            PublishResult::Redirected { .. } => "REDIRECTED",
            PublishResult::Unpublished => "UNPUBLISHED",
            PublishResult::Failed { .. } => "FAILED",
        }
    }
}

/// Snapshot handed to the remote transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEvent {
    pub route: String,
    pub markup: String,
    pub content_type: Option<String>,
    pub metadata: Metadata,
    pub revision_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectEvent {
    pub source: String,
    pub destination: String,
    pub status_code: u16,
}

impl RedirectEvent {
    pub fn new(source: impl Into<String>, destination: impl Into<String>, status_code: u16) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            status_code,
        }
    }

    pub fn permanent(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(source, destination, 301)
    }
}
