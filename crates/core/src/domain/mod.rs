// Domain Layer - Pure business logic and entities

pub mod content;
pub mod error;
pub mod job;
pub mod publish;
pub mod queue;
pub mod token;
pub mod traffic;

// Re-exports
pub use content::{Author, ContentItem, ScheduledTransition};
pub use error::DomainError;
pub use job::{PublishJob, QueueName, DEFAULT_QUEUE};
pub use publish::{Metadata, PublishEvent, PublishResult, RedirectEvent};
pub use queue::{payload_hash, ClaimedJob, NewQueueRecord, QueueRecord};
pub use token::{Token, ValidationResult};
pub use traffic::{PatternList, TrafficRecord};
