//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};
use snapshot_core::domain::{PublishJob, ValidationResult};

/// queue.enqueue.v1 - Enqueue a publish job
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    /// Defaults to the configured publish queue
    #[serde(default)]
    pub queue: Option<String>,
    pub job: PublishJob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    /// False when an identical job was already pending
    pub enqueued: bool,
    pub queue: String,
}

/// queue.stats.v1
#[derive(Debug, Default, Deserialize)]
pub struct StatsRequest {
    #[serde(default)]
    pub queue: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub queue: String,
    pub size: i64,
    pub tracked_urls: i64,
}

/// cache.invalidate.v1 - Re-publish every URL tagged with any of `tags`
#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub urls: Vec<String>,
    pub enqueued: usize,
    pub skipped_tags: usize,
}

/// render.authorize.v1 - Origin asks whether a render request is trusted
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub token: String,
    pub route: String,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub result: ValidationResult,
}

/// traffic.record.v1 - Origin reports the cache tags of a rendered URL
#[derive(Debug, Deserialize)]
pub struct RecordTrafficRequest {
    pub url: String,
    pub token: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub cacheable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTrafficResponse {
    pub recorded: bool,
}

/// content.unpublish.v1 - Withdraw a route immediately
#[derive(Debug, Deserialize)]
pub struct UnpublishRequest {
    pub route: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpublishResponse {
    pub unpublished: bool,
}

/// admin.tokens.release.v1 / admin.traffic.clear.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: u64,
}
