// Snapshot metadata - ordered builder plugins merged into one map

mod builders;

pub use builders::{
    AuthorshipMetadata, PublishStateMetadata, RevisionMetadata, SearchRecordMetadata,
    TransitionMetadata,
};

use crate::domain::{ContentItem, Metadata};
use std::sync::Arc;
use tracing::trace;

/// Contributes keys to the metadata attached to a published snapshot
pub trait MetadataBuilder: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn applies(&self, item: &ContentItem) -> bool;

    /// Keys for `item`; `language` is the translation being published when
    /// it differs from the item's own
    fn build(&self, item: &ContentItem, language: Option<&str>) -> Metadata;
}

/// Builders in registration order. Later builders overwrite earlier keys.
#[derive(Clone, Default)]
pub struct MetadataRegistry {
    builders: Vec<Arc<dyn MetadataBuilder>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in builder
    pub fn with_defaults() -> Self {
        Self::new()
            .register(PublishStateMetadata)
            .register(RevisionMetadata)
            .register(AuthorshipMetadata)
            .register(TransitionMetadata)
            .register(SearchRecordMetadata)
    }

    pub fn register(mut self, builder: impl MetadataBuilder + 'static) -> Self {
        self.builders.push(Arc::new(builder));
        self
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    pub fn build(&self, item: &ContentItem, language: Option<&str>) -> Metadata {
        let mut metadata = Metadata::new();
        for builder in &self.builders {
            if !builder.applies(item) {
                continue;
            }
            trace!(builder = builder.name(), item_id = %item.id, "Building metadata");
            for (key, value) in builder.build(item, language) {
                metadata.insert(key, value);
            }
        }
        metadata
    }
}
