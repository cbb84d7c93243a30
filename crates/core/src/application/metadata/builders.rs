use super::MetadataBuilder;
use crate::domain::{ContentItem, Metadata};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

fn iso8601(epoch_ms: i64) -> Value {
    match Utc.timestamp_millis_opt(epoch_ms).single() {
        Some(at) => Value::String(at.to_rfc3339()),
        None => Value::Null,
    }
}

/// Identity, language and publish flag
pub struct PublishStateMetadata;

impl MetadataBuilder for PublishStateMetadata {
    fn name(&self) -> &'static str {
        "publish_state"
    }

    fn applies(&self, _item: &ContentItem) -> bool {
        true
    }

    fn build(&self, item: &ContentItem, language: Option<&str>) -> Metadata {
        let mut m = Metadata::new();
        m.insert("id".into(), json!(item.id));
        m.insert("title".into(), json!(item.title));
        m.insert("language".into(), json!(language.unwrap_or(&item.language)));
        m.insert("published".into(), json!(item.published));
        if !item.bundle.is_empty() {
            m.insert("bundle".into(), json!(item.bundle));
        }
        if item.changed_at > 0 {
            m.insert("changed".into(), iso8601(item.changed_at));
        }
        m
    }
}

pub struct RevisionMetadata;

impl MetadataBuilder for RevisionMetadata {
    fn name(&self) -> &'static str {
        "revision"
    }

    fn applies(&self, item: &ContentItem) -> bool {
        item.revision_id.is_some()
    }

    fn build(&self, item: &ContentItem, _language: Option<&str>) -> Metadata {
        let mut m = Metadata::new();
        m.insert("revision_id".into(), json!(item.revision_id));
        m.insert("default_revision".into(), json!(item.default_revision));
        if let Some(created) = item.revision_created_at {
            m.insert("revision_created".into(), iso8601(created));
        }
        m
    }
}

pub struct AuthorshipMetadata;

impl MetadataBuilder for AuthorshipMetadata {
    fn name(&self) -> &'static str {
        "authorship"
    }

    fn applies(&self, item: &ContentItem) -> bool {
        item.author.is_some()
    }

    fn build(&self, item: &ContentItem, _language: Option<&str>) -> Metadata {
        let mut m = Metadata::new();
        if let Some(author) = &item.author {
            m.insert(
                "author".into(),
                json!({ "id": author.id, "name": author.name }),
            );
        }
        m
    }
}

/// Upcoming scheduled publish-state changes, soonest first
pub struct TransitionMetadata;

impl MetadataBuilder for TransitionMetadata {
    fn name(&self) -> &'static str {
        "transitions"
    }

    fn applies(&self, item: &ContentItem) -> bool {
        !item.scheduled_transitions.is_empty()
    }

    fn build(&self, item: &ContentItem, _language: Option<&str>) -> Metadata {
        let mut transitions = item.scheduled_transitions.clone();
        transitions.sort_by_key(|t| t.at);

        let mut m = Metadata::new();
        m.insert(
            "scheduled_transitions".into(),
            Value::Array(
                transitions
                    .iter()
                    .map(|t| json!({ "action": t.action, "at": iso8601(t.at) }))
                    .collect(),
            ),
        );
        m
    }
}

/// Search index document for searchable items
pub struct SearchRecordMetadata;

impl MetadataBuilder for SearchRecordMetadata {
    fn name(&self) -> &'static str {
        "search"
    }

    fn applies(&self, item: &ContentItem) -> bool {
        item.searchable && item.published
    }

    fn build(&self, item: &ContentItem, language: Option<&str>) -> Metadata {
        let mut m = Metadata::new();
        m.insert(
            "search".into(),
            json!({
                "title": item.title,
                "summary": item.summary,
                "url": item.route,
                "language": language.unwrap_or(&item.language),
            }),
        );
        m
    }
}
