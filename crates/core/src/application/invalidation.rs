// Cache-tag invalidation: tags -> affected URLs -> route jobs

use crate::application::queue::DedupQueue;
use crate::application::traffic::TrafficRegistry;
use crate::domain::traffic::is_valid_tag;
use crate::domain::PublishJob;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of processing one set of invalidation tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    /// Distinct URLs resolved from the tags
    pub urls: Vec<String>,
    /// Route jobs newly enqueued (duplicates excluded)
    pub enqueued: usize,
    /// Tags ignored: already handled in the batch, blocklisted or malformed
    pub skipped_tags: usize,
    /// Enqueue attempts that failed
    pub failed: usize,
}

impl InvalidationReport {
    fn merge(&mut self, other: InvalidationReport) {
        for url in other.urls {
            if !self.urls.contains(&url) {
                self.urls.push(url);
            }
        }
        self.enqueued += other.enqueued;
        self.skipped_tags += other.skipped_tags;
        self.failed += other.failed;
    }
}

/// Turns invalidation signals into route jobs on the publish queue
pub struct InvalidationHandler {
    registry: Arc<TrafficRegistry>,
    queue: Arc<DedupQueue>,
    queue_name: String,
}

impl InvalidationHandler {
    pub fn new(registry: Arc<TrafficRegistry>, queue: Arc<DedupQueue>, queue_name: impl Into<String>) -> Self {
        Self {
            registry,
            queue,
            queue_name: queue_name.into(),
        }
    }

    /// Start a batch; tags handled earlier in the same batch are skipped
    pub fn batch(&self) -> InvalidationBatch<'_> {
        InvalidationBatch {
            handler: self,
            seen: HashSet::new(),
            report: InvalidationReport::default(),
        }
    }

    /// Handle a single signal as its own batch
    pub async fn invalidate<I, S>(&self, tags: I) -> InvalidationReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = self.batch();
        batch.invalidate(tags).await;
        batch.finish()
    }

    async fn enqueue_url(&self, url: &str, report: &mut InvalidationReport) {
        let job = PublishJob::route(url);
        match self.queue.enqueue(&self.queue_name, &job).await {
            Ok(true) => report.enqueued += 1,
            Ok(false) => {}
            Err(e) => {
                report.failed += 1;
                warn!(url = %url, error = %e, "Failed to enqueue invalidated route");
            }
        }
    }
}

pub struct InvalidationBatch<'a> {
    handler: &'a InvalidationHandler,
    seen: HashSet<String>,
    report: InvalidationReport,
}

impl InvalidationBatch<'_> {
    /// Resolve and enqueue for every tag not seen yet in this batch
    pub async fn invalidate<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = InvalidationReport::default();

        for tag in tags {
            let tag = tag.as_ref().trim();
            if tag.is_empty() {
                continue;
            }
            if !is_valid_tag(tag)
                || self.handler.registry.is_tag_blocked(tag)
                || !self.seen.insert(tag.to_string())
            {
                report.skipped_tags += 1;
                continue;
            }

            for url in self.handler.registry.resolve_tag(tag).await {
                if report.urls.contains(&url) || self.report.urls.contains(&url) {
                    continue;
                }
                self.handler.enqueue_url(&url, &mut report).await;
                report.urls.push(url);
            }
        }

        self.report.merge(report);
    }

    pub fn report(&self) -> &InvalidationReport {
        &self.report
    }

    pub fn finish(self) -> InvalidationReport {
        if !self.report.urls.is_empty() {
            info!(
                urls = self.report.urls.len(),
                enqueued = self.report.enqueued,
                failed = self.report.failed,
                "Processed cache invalidation"
            );
        }
        self.report
    }
}
