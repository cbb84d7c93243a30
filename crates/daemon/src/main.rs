//! Snapshot Publisher - Main Entry Point
//! JSON-RPC server + worker pool + token maintenance

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use config::DaemonConfig;
use snapshot_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use snapshot_core::application::{
    shutdown_channel, DedupQueue, InvalidationHandler, JobContext, MaintenanceScheduler,
    MetadataRegistry, SnapshotPublisher, TokenStore, TrafficRegistry, WorkerPool,
};
use snapshot_core::port::time_provider::SystemTimeProvider;
use snapshot_infra_http::{
    HttpContentRepository, HttpOriginClient, HttpPublishTransport, OriginClientConfig,
    TransportConfig,
};
use snapshot_infra_sqlite::{
    create_pool, run_migrations, SqliteQueueRepository, SqliteTokenRepository,
    SqliteTrafficRepository,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// JSON or pretty output on a non-blocking stdout writer
fn init_logging() -> (WorkerGuard, Result<()>) {
    let log_format = std::env::var("SNAPSHOT_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("snapshot=info"));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let fmt_layer = match log_format.as_str() {
        // Production: JSON structured logging
        "json" => fmt::layer().json().with_writer(writer).boxed(),
        _ => fmt::layer().pretty().with_writer(writer).boxed(),
    };

    let (otel_layer, otel_status) = match telemetry::layer() {
        Ok(layer) => (layer, Ok(())),
        Err(e) => (None, Err(e)),
    };

    tracing_subscriber::registry()
        .with(otel_layer)
        .with(env_filter)
        .with(fmt_layer)
        .init();

    (guard, otel_status)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    let (_log_guard, otel_status) = init_logging();
    if let Err(e) = otel_status {
        warn!(error = %e, "OpenTelemetry disabled (continuing without it)");
    }

    info!("Snapshot Publisher v{} starting...", VERSION);

    // 2. Configuration
    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    let publisher_config = config.publisher.clone();

    // 3. Database
    if !config.is_in_memory() {
        if let Some(parent) = Path::new(&config.db_path).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    info!(db_path = %config.db_path, "Initializing database...");
    let pool = create_pool(&config.db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Services (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let queue = Arc::new(DedupQueue::new(
        Arc::new(SqliteQueueRepository::new(pool.clone())),
        time_provider.clone(),
    ));
    let tokens = Arc::new(TokenStore::new(
        Arc::new(SqliteTokenRepository::new(pool.clone())),
        time_provider.clone(),
        publisher_config.token.clone(),
    ));
    let traffic = Arc::new(
        TrafficRegistry::new(
            Arc::new(SqliteTrafficRepository::new(pool.clone())),
            &publisher_config.traffic,
        )
        .map_err(|e| anyhow::anyhow!("Traffic registry setup failed: {}", e))?,
    );
    let invalidation = Arc::new(InvalidationHandler::new(
        traffic.clone(),
        queue.clone(),
        publisher_config.queue.clone(),
    ));

    // 5. HTTP adapters
    let origin = Arc::new(
        HttpOriginClient::new(&OriginClientConfig {
            base_url: config.origin_url.clone(),
            verify_tls: publisher_config.verify_tls,
        })
        .map_err(|e| anyhow::anyhow!("Origin client setup failed: {}", e))?,
    );
    let transport = Arc::new(
        HttpPublishTransport::new(TransportConfig {
            base_url: config.transport_url.clone(),
            api_token: config.transport_token.clone(),
            files_root: config.files_root.clone(),
            timeout: publisher_config.render_timeout,
        })
        .map_err(|e| anyhow::anyhow!("Transport setup failed: {}", e))?,
    );
    let content = Arc::new(
        HttpContentRepository::new(config.origin_url.clone(), publisher_config.render_timeout)
            .map_err(|e| anyhow::anyhow!("Content client setup failed: {}", e))?,
    );

    let publisher = Arc::new(
        SnapshotPublisher::new(
            publisher_config.clone(),
            tokens.clone(),
            origin,
            transport,
            content,
            MetadataRegistry::with_defaults(),
        )
        .map_err(|e| anyhow::anyhow!("Publisher setup failed: {}", e))?,
    );

    // 6. JSON-RPC server
    info!("Starting JSON-RPC server...");
    let handler = RpcHandler::new(
        publisher_config.queue.clone(),
        queue.clone(),
        tokens.clone(),
        traffic,
        invalidation,
        publisher.clone(),
    );
    let rpc_config = RpcServerConfig {
        port: config.rpc_port,
        ..Default::default()
    };
    let (rpc_addr, rpc_handle) = RpcServer::new(rpc_config, handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 7. Worker pool
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let pool_handle = WorkerPool::new(
        publisher_config.worker_count,
        &publisher_config.queue,
        publisher_config.lease_duration,
        queue,
        JobContext::new(publisher),
    )
    .start(shutdown_rx.clone());

    // 8. Token maintenance
    info!(every_secs = config.purge_interval.as_secs(), "Starting maintenance scheduler...");
    let maintenance = MaintenanceScheduler::new(tokens, config.purge_interval);
    let maintenance_handle = tokio::spawn(maintenance.run(shutdown_rx));

    info!(rpc = %rpc_addr, queue = %publisher_config.queue, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 9. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 10. Graceful shutdown
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if tokio::time::timeout(SHUTDOWN_GRACE, pool_handle.join())
        .await
        .is_err()
    {
        warn!("Workers did not stop in time; pending leases will expire");
    }
    let _ = maintenance_handle.await;
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}
