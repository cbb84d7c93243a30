// Snapshot Infrastructure - SQLite Adapter
// Implements: QueueRepository, TokenRepository, TrafficRepository

mod connection;
mod error;
mod migration;
mod queue_repository;
mod token_repository;
mod traffic_repository;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use queue_repository::SqliteQueueRepository;
pub use token_repository::SqliteTokenRepository;
pub use traffic_repository::SqliteTrafficRepository;

// Note: sqlx::Error conversion is handled by error::map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
