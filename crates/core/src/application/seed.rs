// Bulk seeding - producer -> bounded channel -> N enqueue consumers

use crate::application::queue::DedupQueue;
use crate::domain::PublishJob;
use serde::Serialize;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

pub const DEFAULT_SEED_CONSUMERS: usize = 4;
pub const DEFAULT_SEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub submitted: usize,
    pub enqueued: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl AddAssign for SeedReport {
    fn add_assign(&mut self, other: Self) {
        self.submitted += other.submitted;
        self.enqueued += other.enqueued;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }
}

/// Enqueues large job sets (e.g. every route of the site) with bounded
/// memory: the producer blocks while the channel is full.
pub struct Seeder {
    queue: Arc<DedupQueue>,
    queue_name: String,
    consumers: usize,
    capacity: usize,
}

impl Seeder {
    pub fn new(queue: Arc<DedupQueue>, queue_name: impl Into<String>) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
            consumers: DEFAULT_SEED_CONSUMERS,
            capacity: DEFAULT_SEED_CAPACITY,
        }
    }

    pub fn with_consumers(mut self, consumers: usize) -> Self {
        self.consumers = consumers.max(1);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub async fn seed<I>(&self, jobs: I) -> SeedReport
    where
        I: IntoIterator<Item = PublishJob>,
    {
        let (tx, rx) = mpsc::channel::<PublishJob>(self.capacity);
        let rx = Arc::new(Mutex::new(rx));

        let consumers: Vec<_> = (0..self.consumers)
            .map(|_| {
                let rx = rx.clone();
                let queue = self.queue.clone();
                let queue_name = self.queue_name.clone();
                tokio::spawn(async move { consume(rx, queue, queue_name).await })
            })
            .collect();

        let mut submitted = 0;
        for job in jobs {
            if tx.send(job).await.is_err() {
                warn!("Seed consumers stopped early");
                break;
            }
            submitted += 1;
        }
        drop(tx);

        let mut report = SeedReport {
            submitted,
            ..Default::default()
        };
        for result in futures::future::join_all(consumers).await {
            match result {
                Ok(partial) => report += partial,
                Err(e) => warn!(error = %e, "Seed consumer failed"),
            }
        }

        info!(
            queue = %self.queue_name,
            submitted = report.submitted,
            enqueued = report.enqueued,
            duplicates = report.duplicates,
            failed = report.failed,
            "Seeding finished"
        );
        report
    }
}

async fn consume(
    rx: Arc<Mutex<mpsc::Receiver<PublishJob>>>,
    queue: Arc<DedupQueue>,
    queue_name: String,
) -> SeedReport {
    let mut report = SeedReport::default();
    loop {
        // Lock only while receiving so consumers enqueue concurrently
        let next = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let job = match next {
            Some(job) => job,
            None => break,
        };
        match queue.enqueue(&queue_name, &job).await {
            Ok(true) => report.enqueued += 1,
            Ok(false) => report.duplicates += 1,
            Err(e) => {
                report.failed += 1;
                warn!(job = %job.describe(), error = %e, "Failed to enqueue seeded job");
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_QUEUE;
    use crate::port::queue_repository::mocks::InMemoryQueueRepository;
    use crate::port::time_provider::mocks::ManualTimeProvider;

    fn queue() -> Arc<DedupQueue> {
        Arc::new(DedupQueue::new(
            Arc::new(InMemoryQueueRepository::new()),
            Arc::new(ManualTimeProvider::new(0)),
        ))
    }

    #[tokio::test]
    async fn test_seed_counts_duplicates_and_failures() {
        let queue = queue();
        let seeder = Seeder::new(queue.clone(), DEFAULT_QUEUE)
            .with_consumers(3)
            .with_capacity(2);

        let mut jobs: Vec<PublishJob> = (0..20).map(|i| PublishJob::route(format!("/p/{}", i))).collect();
        jobs.push(PublishJob::route("/p/0"));
        jobs.push(PublishJob::route("no-slash"));

        let report = seeder.seed(jobs).await;
        assert_eq!(
            report,
            SeedReport {
                submitted: 22,
                enqueued: 20,
                duplicates: 1,
                failed: 1,
            }
        );
        assert_eq!(queue.size(DEFAULT_QUEUE).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_seed_nothing() {
        let report = Seeder::new(queue(), DEFAULT_QUEUE).seed(Vec::new()).await;
        assert_eq!(report, SeedReport::default());
    }
}
