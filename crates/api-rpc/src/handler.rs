//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC parameters onto the application services.

use crate::error::{code, to_rpc_error};
use crate::types::{
    AuthorizeRequest, AuthorizeResponse, ClearResponse, EnqueueRequest, EnqueueResponse,
    InvalidateRequest, InvalidateResponse, RecordTrafficRequest, RecordTrafficResponse,
    StatsRequest, StatsResponse, UnpublishRequest, UnpublishResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use snapshot_core::application::{
    DedupQueue, InvalidationHandler, SnapshotPublisher, TokenStore, TrafficRegistry,
};
use snapshot_core::domain::job::validate_route;
use snapshot_core::domain::PublishResult;
use snapshot_core::error::AppError;
use std::sync::Arc;
use tracing::{info, warn};

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    queue_name: String,
    queue: Arc<DedupQueue>,
    tokens: Arc<TokenStore>,
    traffic: Arc<TrafficRegistry>,
    invalidation: Arc<InvalidationHandler>,
    publisher: Arc<SnapshotPublisher>,
}

impl RpcHandler {
    pub fn new(
        queue_name: impl Into<String>,
        queue: Arc<DedupQueue>,
        tokens: Arc<TokenStore>,
        traffic: Arc<TrafficRegistry>,
        invalidation: Arc<InvalidationHandler>,
        publisher: Arc<SnapshotPublisher>,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            queue,
            tokens,
            traffic,
            invalidation,
            publisher,
        }
    }

    /// queue.enqueue.v1
    pub async fn enqueue(&self, params: EnqueueRequest) -> Result<EnqueueResponse, ErrorObjectOwned> {
        let queue = params.queue.unwrap_or_else(|| self.queue_name.clone());
        let enqueued = self
            .queue
            .enqueue(&queue, &params.job)
            .await
            .map_err(to_rpc_error)?;
        Ok(EnqueueResponse { enqueued, queue })
    }

    /// queue.stats.v1
    pub async fn stats(&self, params: StatsRequest) -> Result<StatsResponse, ErrorObjectOwned> {
        let queue = params.queue.unwrap_or_else(|| self.queue_name.clone());
        let size = self.queue.size(&queue).await.map_err(to_rpc_error)?;
        let tracked_urls = self.traffic.count().await.map_err(to_rpc_error)?;
        Ok(StatsResponse {
            queue,
            size,
            tracked_urls,
        })
    }

    /// cache.invalidate.v1
    pub async fn invalidate(
        &self,
        params: InvalidateRequest,
    ) -> Result<InvalidateResponse, ErrorObjectOwned> {
        let report = self.invalidation.invalidate(&params.tags).await;
        Ok(InvalidateResponse {
            urls: report.urls,
            enqueued: report.enqueued,
            skipped_tags: report.skipped_tags,
        })
    }

    /// render.authorize.v1
    ///
    /// Rejections carry the validation result as error data.
    pub async fn authorize(
        &self,
        params: AuthorizeRequest,
    ) -> Result<AuthorizeResponse, ErrorObjectOwned> {
        let result = self
            .tokens
            .validate(&params.token, &params.route, params.strict)
            .await
            .map_err(to_rpc_error)?;

        if !result.is_accepted() {
            return Err(ErrorObjectOwned::owned(
                code::AUTHENTICATION_FAILED,
                format!("Render request rejected: {}", result),
                Some(result),
            ));
        }
        Ok(AuthorizeResponse { result })
    }

    /// traffic.record.v1
    pub async fn record_traffic(
        &self,
        params: RecordTrafficRequest,
    ) -> Result<RecordTrafficResponse, ErrorObjectOwned> {
        let result = self
            .tokens
            .validate_traffic(&params.token, &params.url)
            .await
            .map_err(to_rpc_error)?;
        if !result.is_accepted() {
            return Err(to_rpc_error(AppError::Authentication(result.to_string())));
        }

        if !params.cacheable || params.tags.is_empty() {
            return Ok(RecordTrafficResponse { recorded: false });
        }

        let recorded = self
            .traffic
            .record(&params.url, &params.tags)
            .await
            .map_err(to_rpc_error)?;
        Ok(RecordTrafficResponse { recorded })
    }

    /// content.unpublish.v1
    pub async fn unpublish(
        &self,
        params: UnpublishRequest,
    ) -> Result<UnpublishResponse, ErrorObjectOwned> {
        validate_route(&params.route).map_err(|e| to_rpc_error(e.into()))?;

        match self.publisher.unpublish(&params.route).await {
            PublishResult::Failed { reason } => {
                warn!(route = %params.route, reason = %reason, "Unpublish request failed");
                Err(ErrorObjectOwned::owned(code::TRANSPORT_ERROR, reason, None::<()>))
            }
            _ => {
                if let Err(e) = self.traffic.remove(&params.route).await {
                    warn!(route = %params.route, error = %e, "Failed to drop traffic record");
                }
                Ok(UnpublishResponse { unpublished: true })
            }
        }
    }

    /// admin.tokens.release.v1
    pub async fn release_tokens(&self) -> Result<ClearResponse, ErrorObjectOwned> {
        let removed = self.tokens.release().await.map_err(to_rpc_error)?;
        Ok(ClearResponse { removed })
    }

    /// admin.traffic.clear.v1
    pub async fn clear_traffic(&self) -> Result<ClearResponse, ErrorObjectOwned> {
        let removed = self.traffic.clear().await.map_err(to_rpc_error)?;
        info!(removed = removed, "Traffic registry cleared");
        Ok(ClearResponse { removed })
    }
}
