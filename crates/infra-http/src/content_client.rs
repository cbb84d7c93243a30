// Content lookup against the origin's JSON endpoint (reqwest)

use crate::{endpoint, map_reqwest_error};
use async_trait::async_trait;
use reqwest::StatusCode;
use snapshot_core::domain::ContentItem;
use snapshot_core::error::Result;
use snapshot_core::port::{ContentRepository, TransportError};
use std::time::Duration;

/// `GET {base}/_snapshot/content/{id}[?revision=]` returning every
/// translation as a JSON array; 404 means the item is gone.
pub struct HttpContentRepository {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpContentRepository {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> std::result::Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }
}

#[async_trait]
impl ContentRepository for HttpContentRepository {
    async fn load(&self, item_id: &str, revision_id: Option<&str>) -> Result<Vec<ContentItem>> {
        let url = endpoint(&self.base_url, &format!("/_snapshot/content/{}", item_id));
        let mut request = self.client.get(url);
        if let Some(revision) = revision_id {
            request = request.query(&[("revision", revision)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => Ok(response
                .json::<Vec<ContentItem>>()
                .await
                .map_err(|e| map_reqwest_error(e, self.timeout))?),
            status => Err(TransportError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }
            .into()),
        }
    }
}
