// Publish Job Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Queue identifier
pub type QueueName = String;

/// Queue used when a producer does not name one
pub const DEFAULT_QUEUE: &str = "publish";

/// Redirect codes the transport understands. `0` means "no redirect" and
/// turns the job into an unpublish of the source.
const REDIRECT_STATUS_CODES: [u16; 5] = [301, 302, 303, 307, 308];

/// A unit of publish work.
///
/// Jobs are immutable once enqueued. Their serialized form is hashed together
/// with the queue name to deduplicate pending work, so field order and the
/// normalization done by the constructors matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublishJob {
    /// Render and publish a single route.
    Route { route: String },

    /// Publish every translation of a content item (optionally a specific revision).
    ContentItem {
        item_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revision_id: Option<String>,
        /// Languages to publish; empty means all.
        #[serde(default)]
        language_filter: Vec<String>,
    },

    /// Emit (or withdraw) a redirect.
    Redirect {
        source: String,
        destination: String,
        status_code: u16,
        /// Source path before the redirect was edited; unpublished when it differs.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_source: Option<String>,
    },

    /// Ship a static file relative to the configured files root.
    File { path: String },
}

impl PublishJob {
    pub fn route(route: impl Into<String>) -> Self {
        Self::Route {
            route: route.into(),
        }
    }

    /// Language filter is sorted and deduplicated so equivalent requests hash identically.
    pub fn content_item(
        item_id: impl Into<String>,
        revision_id: Option<String>,
        language_filter: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut language_filter: Vec<String> = language_filter.into_iter().collect();
        language_filter.sort();
        language_filter.dedup();

        Self::ContentItem {
            item_id: item_id.into(),
            revision_id,
            language_filter,
        }
    }

    pub fn redirect(
        source: impl Into<String>,
        destination: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::Redirect {
            source: source.into(),
            destination: destination.into(),
            status_code,
            previous_source: None,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::File { path: path.into() }
    }

    /// Short job kind label used in logs and stats
    pub fn kind(&self) -> &'static str {
        match self {
            PublishJob::Route { .. } => "route",
            PublishJob::ContentItem { .. } => "content_item",
            PublishJob::Redirect { .. } => "redirect",
            PublishJob::File { .. } => "file",
        }
    }

    /// Human readable one-liner describing the job
    pub fn describe(&self) -> String {
        match self {
            PublishJob::Route { route } => format!("Route {}", route),
            PublishJob::ContentItem {
                item_id,
                revision_id,
                language_filter,
            } => {
                let mut out = format!("Content item {}", item_id);
                if let Some(rev) = revision_id {
                    out.push_str(&format!(" (revision {})", rev));
                }
                if !language_filter.is_empty() {
                    out.push_str(&format!(" [{}]", language_filter.join(", ")));
                }
                out
            }
            PublishJob::Redirect {
                source,
                destination,
                status_code,
                ..
            } => format!("Redirect {} -> {} ({})", source, destination, status_code),
            PublishJob::File { path } => format!("File {}", path),
        }
    }

    /// Progress line emitted by workers when a job starts
    pub fn log_line(&self) -> String {
        match self {
            PublishJob::Route { route } => format!("Publishing route {}", route),
            PublishJob::ContentItem { item_id, .. } => {
                format!("Publishing content item {}", item_id)
            }
            PublishJob::Redirect {
                source,
                status_code: 0,
                ..
            } => format!("Withdrawing redirect {}", source),
            PublishJob::Redirect {
                source,
                destination,
                ..
            } => format!("Publishing redirect {} -> {}", source, destination),
            PublishJob::File { path } => format!("Sending file {}", path),
        }
    }

    /// Reject malformed jobs before they reach the queue
    pub fn validate(&self) -> Result<()> {
        match self {
            PublishJob::Route { route } => validate_route(route),
            PublishJob::ContentItem { item_id, .. } => {
                if item_id.trim().is_empty() {
                    return Err(DomainError::ValidationError(
                        "Content item id cannot be empty".to_string(),
                    ));
                }
                Ok(())
            }
            PublishJob::Redirect {
                source,
                destination,
                status_code,
                previous_source,
            } => {
                validate_route(source)?;
                if let Some(previous) = previous_source {
                    validate_route(previous)?;
                }
                if *status_code != 0 {
                    if !REDIRECT_STATUS_CODES.contains(status_code) {
                        return Err(DomainError::InvalidStatusCode(*status_code));
                    }
                    if destination.trim().is_empty() {
                        return Err(DomainError::ValidationError(
                            "Redirect destination cannot be empty".to_string(),
                        ));
                    }
                }
                Ok(())
            }
            PublishJob::File { path } => {
                if path.trim().is_empty() || path.split('/').any(|seg| seg == "..") {
                    return Err(DomainError::ValidationError(format!(
                        "Invalid file path: {}",
                        path
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Routes are absolute, site-relative paths.
pub fn validate_route(route: &str) -> Result<()> {
    if !route.starts_with('/') {
        return Err(DomainError::InvalidRoute(format!(
            "`{}` must start with '/'",
            route
        )));
    }
    if route.starts_with("//") || route.contains(char::is_whitespace) || route.contains('\0') {
        return Err(DomainError::InvalidRoute(route.to_string()));
    }
    Ok(())
}
