//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP on localhost.

use crate::handler::RpcHandler;
use crate::types::{
    AuthorizeRequest, EnqueueRequest, InvalidateRequest, RecordTrafficRequest, StatsRequest,
    UnpublishRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9530;

/// RPC Server Configuration
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Start the JSON-RPC server; returns the bound address with the handle
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = build_module(self.handler).map_err(|e| e.to_string())?;

        info!(addr = %local_addr, "JSON-RPC server started successfully");
        Ok((local_addr, server.start(module)))
    }
}

/// Register every method on a fresh module
pub fn build_module(
    handler: Arc<RpcHandler>,
) -> Result<RpcModule<()>, jsonrpsee::core::RegisterMethodError> {
    let mut module = RpcModule::new(());

    let h = handler.clone();
    module.register_async_method("queue.enqueue.v1", move |params, _, _| {
        let handler = h.clone();
        async move {
            let req: EnqueueRequest = params.parse()?;
            handler.enqueue(req).await
        }
    })?;

    let h = handler.clone();
    module.register_async_method("queue.stats.v1", move |params, _, _| {
        let handler = h.clone();
        async move {
            // Parameters are optional for this method
            let req: StatsRequest = if params.as_str().is_some() {
                params.parse()?
            } else {
                StatsRequest::default()
            };
            handler.stats(req).await
        }
    })?;

    let h = handler.clone();
    module.register_async_method("cache.invalidate.v1", move |params, _, _| {
        let handler = h.clone();
        async move {
            let req: InvalidateRequest = params.parse()?;
            handler.invalidate(req).await
        }
    })?;

    let h = handler.clone();
    module.register_async_method("render.authorize.v1", move |params, _, _| {
        let handler = h.clone();
        async move {
            let req: AuthorizeRequest = params.parse()?;
            handler.authorize(req).await
        }
    })?;

    let h = handler.clone();
    module.register_async_method("traffic.record.v1", move |params, _, _| {
        let handler = h.clone();
        async move {
            let req: RecordTrafficRequest = params.parse()?;
            handler.record_traffic(req).await
        }
    })?;

    let h = handler.clone();
    module.register_async_method("content.unpublish.v1", move |params, _, _| {
        let handler = h.clone();
        async move {
            let req: UnpublishRequest = params.parse()?;
            handler.unpublish(req).await
        }
    })?;

    // Admin APIs
    let h = handler.clone();
    module.register_async_method("admin.tokens.release.v1", move |_, _, _| {
        let handler = h.clone();
        async move { handler.release_tokens().await }
    })?;

    let h = handler;
    module.register_async_method("admin.traffic.clear.v1", move |_, _, _| {
        let handler = h.clone();
        async move { handler.clear_traffic().await }
    })?;

    Ok(module)
}
