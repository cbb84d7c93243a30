// Application Layer - Use Cases and Business Logic

pub mod dispatch;
pub mod invalidation;
pub mod maintenance;
pub mod metadata;
pub mod publisher;
pub mod queue;
pub mod seed;
pub mod token;
pub mod traffic;
pub mod worker;

// Re-exports
pub use dispatch::{JobContext, JobOutcome};
pub use invalidation::{InvalidationBatch, InvalidationHandler, InvalidationReport};
pub use maintenance::MaintenanceScheduler;
pub use metadata::{MetadataBuilder, MetadataRegistry};
pub use publisher::SnapshotPublisher;
pub use queue::DedupQueue;
pub use seed::{SeedReport, Seeder};
pub use token::TokenStore;
pub use traffic::TrafficRegistry;
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker, WorkerPool, WorkerPoolHandle};
