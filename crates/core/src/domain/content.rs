// Content Item Model (read-only view of the origin CMS)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

/// Pending publish-state change scheduled in the origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTransition {
    /// e.g. "publish", "unpublish", "archive"
    pub action: String,
    pub at: i64, // epoch ms
}

/// One translation of a content item as seen by the publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(default)]
    pub bundle: String,
    pub language: String,
    pub title: String,
    /// Canonical (aliased) route, e.g. `/about-us`
    pub route: String,
    /// Raw route of the item, e.g. `/node/12`
    pub internal_route: String,
    pub published: bool,
    #[serde(default = "default_true")]
    pub default_revision: bool,
    #[serde(default)]
    pub revision_id: Option<String>,
    #[serde(default)]
    pub revision_created_at: Option<i64>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub changed_at: i64,
    #[serde(default)]
    pub scheduled_transitions: Vec<ScheduledTransition>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub searchable: bool,
}

fn default_true() -> bool {
    true
}

impl ContentItem {
    /// Minimal published item, used by tests and producers that only know routes
    pub fn new(
        id: impl Into<String>,
        language: impl Into<String>,
        title: impl Into<String>,
        route: impl Into<String>,
        internal_route: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            bundle: String::new(),
            language: language.into(),
            title: title.into(),
            route: route.into(),
            internal_route: internal_route.into(),
            published: true,
            default_revision: true,
            revision_id: None,
            revision_created_at: None,
            author: None,
            changed_at: 0,
            scheduled_transitions: Vec::new(),
            summary: None,
            searchable: false,
        }
    }

    /// Whether the canonical route differs from the raw route
    pub fn is_aliased(&self) -> bool {
        self.route != self.internal_route
    }
}
