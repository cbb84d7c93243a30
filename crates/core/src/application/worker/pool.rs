// Worker Pool - N concurrent workers on one queue

use super::{ShutdownToken, Worker};
use crate::application::dispatch::JobContext;
use crate::application::queue::DedupQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub struct WorkerPool {
    workers: Vec<Arc<Worker>>,
}

impl WorkerPool {
    pub fn new(
        size: usize,
        queue_name: &str,
        lease: Duration,
        queue: Arc<DedupQueue>,
        ctx: JobContext,
    ) -> Self {
        let workers = (0..size.max(1))
            .map(|id| {
                Arc::new(Worker::new(
                    id,
                    queue_name,
                    lease,
                    queue.clone(),
                    ctx.clone(),
                ))
            })
            .collect();
        Self { workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Spawn every worker; they stop when `shutdown` fires
    pub fn start(&self, shutdown: ShutdownToken) -> WorkerPoolHandle {
        info!(workers = self.workers.len(), "Starting worker pool");
        let handles = self
            .workers
            .iter()
            .map(|worker| {
                let worker = worker.clone();
                let token = shutdown.clone();
                tokio::spawn(async move {
                    if let Err(e) = worker.run(token).await {
                        error!(error = %e, "Worker exited with error");
                    }
                })
            })
            .collect();
        WorkerPoolHandle { handles }
    }
}

pub struct WorkerPoolHandle {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPoolHandle {
    /// Wait for every worker to finish its current job and exit
    pub async fn join(self) {
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                error!(error = %e, "Worker task failed");
            }
        }
        info!("Worker pool stopped");
    }
}
