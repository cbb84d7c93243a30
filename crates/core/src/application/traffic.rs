// Traffic Registry - which cache tags influenced which rendered URL

use crate::config::TrafficConfig;
use crate::domain::traffic::{is_valid_tag, normalize_tags};
use crate::domain::{PatternList, TrafficRecord};
use crate::error::Result;
use crate::port::TrafficRepository;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct TrafficRegistry {
    repo: Arc<dyn TrafficRepository>,
    tag_blocklist: PatternList,
    path_blocklist: PatternList,
}

impl TrafficRegistry {
    pub fn new(repo: Arc<dyn TrafficRepository>, config: &TrafficConfig) -> Result<Self> {
        Ok(Self {
            repo,
            tag_blocklist: PatternList::new(&config.tag_blocklist)?,
            path_blocklist: PatternList::new(&config.path_blocklist)?,
        })
    }

    /// Upsert the tag set observed for `url`.
    ///
    /// Returns false when nothing was stored: the URL is blocklisted or no
    /// tag survived the blocklist. Callers are responsible for checking the
    /// trust token and cacheability first.
    pub async fn record<I, S>(&self, url: &str, tags: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.path_blocklist.matches(url) {
            debug!(url = %url, "URL is blocklisted, not recording traffic");
            return Ok(false);
        }

        let tags = self.filter_tags(tags);
        if tags.is_empty() {
            return Ok(false);
        }

        let record = TrafficRecord {
            url: url.to_string(),
            tags,
        };
        self.repo.upsert(&record).await?;
        debug!(url = %url, tags = record.tags.len(), "Recorded traffic");
        Ok(true)
    }

    pub async fn find(&self, url: &str) -> Result<Option<TrafficRecord>> {
        self.repo.find(url).await
    }

    pub async fn remove(&self, url: &str) -> Result<bool> {
        self.repo.delete(url).await
    }

    pub async fn clear(&self) -> Result<u64> {
        self.repo.clear().await
    }

    pub async fn count(&self) -> Result<i64> {
        self.repo.count().await
    }

    /// Every recorded URL whose tag set intersects `tags`.
    ///
    /// Never fails: storage errors are logged and yield no URLs.
    pub async fn resolve<I, S>(&self, tags: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut urls = BTreeSet::new();
        for tag in self.filter_tags(tags) {
            urls.extend(self.resolve_tag(&tag).await);
        }
        urls.into_iter().collect()
    }

    /// URLs for a single tag, empty on storage failure
    pub async fn resolve_tag(&self, tag: &str) -> Vec<String> {
        if !is_valid_tag(tag) || self.tag_blocklist.matches(tag) {
            return Vec::new();
        }
        match self.repo.find_urls_by_tag(tag).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!(tag = %tag, error = %e, "Traffic lookup failed, treating as no affected URLs");
                Vec::new()
            }
        }
    }

    pub fn is_tag_blocked(&self, tag: &str) -> bool {
        self.tag_blocklist.matches(tag)
    }

    fn filter_tags<I, S>(&self, tags: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tag_blocklist.filter(&normalize_tags(tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::traffic_repository::mocks::InMemoryTrafficRepository;

    fn registry(tag_blocklist: &[&str], path_blocklist: &[&str]) -> (TrafficRegistry, Arc<InMemoryTrafficRepository>) {
        let repo = Arc::new(InMemoryTrafficRepository::new());
        let config = TrafficConfig {
            tag_blocklist: tag_blocklist.iter().map(|s| s.to_string()).collect(),
            path_blocklist: path_blocklist.iter().map(|s| s.to_string()).collect(),
        };
        (TrafficRegistry::new(repo.clone(), &config).unwrap(), repo)
    }

    #[tokio::test]
    async fn test_resolve_intersecting_urls() {
        let (registry, _) = registry(&[], &[]);
        registry.record("/a", ["t1", "t2"]).await.unwrap();
        registry.record("/b", ["t3"]).await.unwrap();

        assert_eq!(registry.resolve(["t2"]).await, vec!["/a".to_string()]);
        assert!(registry.resolve(["t4"]).await.is_empty());
        assert_eq!(
            registry.resolve(["t1", "t3"]).await,
            vec!["/a".to_string(), "/b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delimited_tag_matches_nothing() {
        let (registry, _) = registry(&[], &[]);
        registry.record("/a", ["t1", "t2"]).await.unwrap();

        assert!(registry.resolve_tag("t1,t2").await.is_empty());
        assert!(registry.resolve_tag(",").await.is_empty());
        assert!(registry.resolve_tag("").await.is_empty());
        assert!(registry.resolve(["t1,t2"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_blocklisted_tags_are_dropped() {
        let (registry, _) = registry(&["node:*"], &[]);
        assert!(registry.record("/page", ["node:1", "other"]).await.unwrap());

        let record = registry.find("/page").await.unwrap().unwrap();
        assert_eq!(record.tags.into_iter().collect::<Vec<_>>(), vec!["other".to_string()]);
        assert!(registry.resolve(["node:1"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_recorded_without_tags() {
        let (registry, _) = registry(&["node:*"], &[]);
        assert!(!registry.record("/page", ["node:1"]).await.unwrap());
        assert!(!registry.record("/page", Vec::<String>::new()).await.unwrap());
        assert_eq!(registry.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blocklisted_paths_not_recorded() {
        let (registry, _) = registry(&[], &["/admin*", "/user/login"]);
        assert!(!registry.record("/admin/config", ["t1"]).await.unwrap());
        assert!(!registry.record("/user/login", ["t1"]).await.unwrap());
        assert!(registry.record("/user/1", ["t1"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_replaces_previous_tags() {
        let (registry, _) = registry(&[], &[]);
        registry.record("/a", ["t1"]).await.unwrap();
        registry.record("/a", ["t2"]).await.unwrap();

        assert!(registry.resolve(["t1"]).await.is_empty());
        assert_eq!(registry.resolve(["t2"]).await, vec!["/a".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_degrades_when_storage_unavailable() {
        let (registry, repo) = registry(&[], &[]);
        registry.record("/a", ["t1"]).await.unwrap();

        repo.set_unavailable(true);
        assert!(registry.resolve(["t1"]).await.is_empty());
        assert!(registry.record("/b", ["t1"]).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (registry, _) = registry(&[], &[]);
        registry.record("/a", ["t1"]).await.unwrap();
        registry.record("/b", ["t1"]).await.unwrap();

        assert!(registry.remove("/a").await.unwrap());
        assert!(!registry.remove("/a").await.unwrap());
        assert_eq!(registry.clear().await.unwrap(), 1);
        assert!(registry.resolve(["t1"]).await.is_empty());
    }
}
