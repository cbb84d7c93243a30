//! Dedup queue against SQLite
//!
//! Duplicate suppression, exclusive claims, lease expiry and persistence.

use snapshot_core::application::{DedupQueue, SeedReport, Seeder};
use snapshot_core::domain::PublishJob;
use snapshot_core::port::time_provider::mocks::ManualTimeProvider;
use snapshot_infra_sqlite::{create_pool, run_migrations, SqliteQueueRepository};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const QUEUE: &str = "publish";
const LEASE: Duration = Duration::from_secs(300);

async fn memory_queue(clock: Arc<ManualTimeProvider>) -> Arc<DedupQueue> {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(DedupQueue::new(
        Arc::new(SqliteQueueRepository::new(pool)),
        clock,
    ))
}

#[tokio::test]
async fn test_identical_jobs_stored_once() {
    let queue = memory_queue(Arc::new(ManualTimeProvider::new(0))).await;
    let job = PublishJob::route("/hello");

    assert!(queue.enqueue(QUEUE, &job).await.unwrap());
    assert!(!queue.enqueue(QUEUE, &job).await.unwrap());
    assert!(!queue.enqueue(QUEUE, &PublishJob::route("/hello")).await.unwrap());
    assert_eq!(queue.size(QUEUE).await.unwrap(), 1);

    // Same payload on another queue is a different record
    assert!(queue.enqueue("other", &job).await.unwrap());
    assert_eq!(queue.size("other").await.unwrap(), 1);
}

#[tokio::test]
async fn test_language_filter_order_does_not_defeat_dedup() {
    let queue = memory_queue(Arc::new(ManualTimeProvider::new(0))).await;
    let a = PublishJob::content_item("12", None, vec!["fr".to_string(), "en".to_string()]);
    let b = PublishJob::content_item("12", None, vec!["en".to_string(), "fr".to_string(), "en".to_string()]);

    assert!(queue.enqueue(QUEUE, &a).await.unwrap());
    assert!(!queue.enqueue(QUEUE, &b).await.unwrap());
}

#[tokio::test]
async fn test_claimed_job_still_blocks_duplicates_until_completed() {
    let queue = memory_queue(Arc::new(ManualTimeProvider::new(0))).await;
    let job = PublishJob::route("/a");
    queue.enqueue(QUEUE, &job).await.unwrap();

    let claimed = queue.claim(QUEUE, LEASE).await.unwrap().unwrap();
    assert_eq!(claimed.job, job);
    assert!(queue.is_pending(QUEUE, &job).await.unwrap());
    assert!(!queue.enqueue(QUEUE, &job).await.unwrap());

    assert!(queue.complete(claimed.id).await.unwrap());
    assert!(!queue.is_pending(QUEUE, &job).await.unwrap());
    assert!(queue.enqueue(QUEUE, &job).await.unwrap());
}

/// Concurrent claimers never receive the same record
#[tokio::test]
async fn test_concurrent_claims_are_exclusive() {
    let queue = memory_queue(Arc::new(ManualTimeProvider::new(0))).await;
    for i in 0..10 {
        queue
            .enqueue(QUEUE, &PublishJob::route(format!("/page-{}", i)))
            .await
            .unwrap();
    }

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let queue = queue.clone();
            tokio::spawn(async move { queue.claim(QUEUE, LEASE).await.unwrap().map(|c| c.id) })
        })
        .collect();

    let claimed: Vec<i64> = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter_map(|r| r.unwrap())
        .collect();
    let unique: HashSet<i64> = claimed.iter().copied().collect();

    assert_eq!(claimed.len(), 10);
    assert_eq!(unique.len(), 10);
}

#[tokio::test]
async fn test_lapsed_lease_redelivers() {
    let clock = Arc::new(ManualTimeProvider::new(1_000));
    let queue = memory_queue(clock.clone()).await;
    queue.enqueue(QUEUE, &PublishJob::route("/a")).await.unwrap();

    let first = queue.claim(QUEUE, LEASE).await.unwrap().unwrap();
    assert!(queue.claim(QUEUE, LEASE).await.unwrap().is_none());

    clock.advance(LEASE.as_millis() as i64 - 1);
    assert!(queue.claim(QUEUE, LEASE).await.unwrap().is_none());

    clock.advance(1);
    let second = queue.claim(QUEUE, LEASE).await.unwrap().unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_release_makes_job_claimable_immediately() {
    let queue = memory_queue(Arc::new(ManualTimeProvider::new(0))).await;
    queue.enqueue(QUEUE, &PublishJob::route("/a")).await.unwrap();

    let claimed = queue.claim(QUEUE, LEASE).await.unwrap().unwrap();
    assert!(queue.release(claimed.id).await.unwrap());
    assert!(queue.claim(QUEUE, LEASE).await.unwrap().is_some());
}

#[tokio::test]
async fn test_pending_jobs_survive_reopen() {
    let path = std::env::temp_dir().join(format!("snapshot-queue-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}", path.display());
    let clock = Arc::new(ManualTimeProvider::new(0));

    {
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let queue = DedupQueue::new(Arc::new(SqliteQueueRepository::new(pool.clone())), clock.clone());
        for i in 0..5 {
            queue
                .enqueue(QUEUE, &PublishJob::route(format!("/p{}", i)))
                .await
                .unwrap();
        }
        pool.close().await;
    }

    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let queue = DedupQueue::new(Arc::new(SqliteQueueRepository::new(pool.clone())), clock);
    assert_eq!(queue.size(QUEUE).await.unwrap(), 5);
    assert!(!queue.enqueue(QUEUE, &PublishJob::route("/p0")).await.unwrap());

    pool.close().await;
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_seeding_reports_duplicates() {
    let queue = memory_queue(Arc::new(ManualTimeProvider::new(0))).await;
    queue.enqueue(QUEUE, &PublishJob::route("/0")).await.unwrap();

    let jobs: Vec<PublishJob> = (0..50)
        .map(|i| PublishJob::route(format!("/{}", i % 25)))
        .collect();
    let report: SeedReport = Seeder::new(queue.clone(), QUEUE)
        .with_consumers(3)
        .with_capacity(8)
        .seed(jobs)
        .await;

    assert_eq!(report.submitted, 50);
    assert_eq!(report.enqueued, 24);
    assert_eq!(report.duplicates, 26);
    assert_eq!(report.failed, 0);
    assert_eq!(queue.size(QUEUE).await.unwrap(), 25);
}
