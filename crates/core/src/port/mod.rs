// Port Layer - Interfaces for external dependencies

pub mod content;
pub mod origin;
pub mod queue_repository;
pub mod time_provider;
pub mod token_repository;
pub mod traffic_repository;
pub mod transport;

// Re-exports
pub use content::ContentRepository;
pub use origin::{OriginClient, RenderRequest, RenderResponse};
pub use queue_repository::QueueRepository;
pub use time_provider::TimeProvider;
pub use token_repository::TokenRepository;
pub use traffic_repository::TrafficRepository;
pub use transport::{PublishTransport, TransportError};
