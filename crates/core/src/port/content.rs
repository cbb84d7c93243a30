// Content Lookup Port
// Read-only access to the origin CMS's view of a content item

use crate::domain::ContentItem;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Every translation of `item_id`, at `revision_id` when given.
    ///
    /// Returns an empty list when the item does not exist (deleted).
    async fn load(&self, item_id: &str, revision_id: Option<&str>) -> Result<Vec<ContentItem>>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryContentRepository {
        items: Mutex<HashMap<String, Vec<ContentItem>>>,
    }

    impl InMemoryContentRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add (or replace) one translation
        pub fn put(&self, item: ContentItem) {
            let mut items = self.items.lock().unwrap();
            let translations = items.entry(item.id.clone()).or_default();
            translations.retain(|t| t.language != item.language);
            translations.push(item);
        }

        pub fn remove(&self, item_id: &str) {
            self.items.lock().unwrap().remove(item_id);
        }
    }

    #[async_trait]
    impl ContentRepository for InMemoryContentRepository {
        async fn load(&self, item_id: &str, revision_id: Option<&str>) -> Result<Vec<ContentItem>> {
            let items = self.items.lock().unwrap();
            let translations = items.get(item_id).cloned().unwrap_or_default();
            Ok(match revision_id {
                Some(rev) => translations
                    .into_iter()
                    .map(|mut t| {
                        t.default_revision = t.revision_id.as_deref() == Some(rev);
                        t.revision_id = Some(rev.to_string());
                        t
                    })
                    .collect(),
                None => translations,
            })
        }
    }
}
