// Job dispatch - the polymorphic `send` behavior of each job kind

use crate::application::publisher::SnapshotPublisher;
use crate::domain::{PublishJob, PublishResult};
use crate::error::AppError;
use std::sync::Arc;

/// Collaborators a job needs to execute
#[derive(Clone)]
pub struct JobContext {
    pub publisher: Arc<SnapshotPublisher>,
}

impl JobContext {
    pub fn new(publisher: Arc<SnapshotPublisher>) -> Self {
        Self { publisher }
    }
}

/// What the worker does with the queue record after `send`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Done; delete the record
    Completed,
    /// Leave the lease to expire so the job is redelivered later
    Abandoned(String),
    /// Release the lease immediately (transient local storage failure)
    Retry(String),
    /// Can never succeed; delete the record
    Discarded(String),
}

impl JobOutcome {
    fn from_error(error: AppError) -> Self {
        match error {
            // Remote failures wait out the lease; releasing would spin on a down backend
            AppError::Transport(_) => JobOutcome::Abandoned(error.to_string()),
            AppError::Database(_) => JobOutcome::Retry(error.to_string()),
            _ => JobOutcome::Discarded(error.to_string()),
        }
    }

    fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a PublishResult>,
    {
        let failures: Vec<&str> = results
            .into_iter()
            .filter_map(|r| match r {
                PublishResult::Failed { reason } => Some(reason.as_str()),
                _ => None,
            })
            .collect();
        if failures.is_empty() {
            JobOutcome::Completed
        } else {
            JobOutcome::Abandoned(failures.join("; "))
        }
    }
}

impl PublishJob {
    /// Execute the job. Safe to repeat: delivery is at-least-once.
    pub async fn send(&self, ctx: &JobContext) -> JobOutcome {
        let publisher = &ctx.publisher;
        match self {
            PublishJob::Route { route } => match publisher.publish_route(route).await {
                Ok(result) => JobOutcome::from_results([&result]),
                Err(e) => JobOutcome::from_error(e),
            },
            PublishJob::ContentItem {
                item_id,
                revision_id,
                language_filter,
            } => match publisher
                .publish_content_item(item_id, revision_id.as_deref(), language_filter)
                .await
            {
                Ok(results) => JobOutcome::from_results(&results),
                Err(e) => JobOutcome::from_error(e),
            },
            PublishJob::Redirect {
                source,
                destination,
                status_code,
                previous_source,
            } => {
                let result = publisher
                    .publish_redirect(source, destination, *status_code, previous_source.as_deref())
                    .await;
                JobOutcome::from_results([&result])
            }
            PublishJob::File { path } => match publisher.publish_file(path).await {
                Ok(()) => JobOutcome::Completed,
                Err(e) => JobOutcome::Abandoned(e.to_string()),
            },
        }
    }
}
