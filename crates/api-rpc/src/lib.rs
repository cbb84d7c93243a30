//! JSON-RPC API Layer
//!
//! Producer and origin-facing entry points of the snapshot publisher:
//! enqueue, invalidation, token checks and traffic observations.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
