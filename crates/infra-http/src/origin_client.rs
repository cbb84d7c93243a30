// Origin render client (reqwest)

use crate::{endpoint, map_reqwest_error};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HOST, LOCATION};
use reqwest::redirect::Policy;
use snapshot_core::port::origin::{REVISION_PARAM, TOKEN_HEADER};
use snapshot_core::port::{OriginClient, RenderRequest, RenderResponse, TransportError};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OriginClientConfig {
    /// Where the origin is reachable, e.g. `http://127.0.0.1:8080`
    pub base_url: String,
    pub verify_tls: bool,
}

/// Renders routes through the origin with a plain POST.
///
/// Redirects are never followed: a 301/302 is a result to classify.
pub struct HttpOriginClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOriginClient {
    pub fn new(config: &OriginClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl OriginClient for HttpOriginClient {
    async fn render(&self, request: &RenderRequest) -> Result<RenderResponse, TransportError> {
        let url = endpoint(&self.base_url, &request.path);
        let mut builder = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .header(TOKEN_HEADER, &request.token);

        if let Some(revision) = &request.revision_id {
            builder = builder.query(&[(REVISION_PARAM, revision)]);
        }
        if let Some(host) = &request.host {
            builder = builder.header(HOST, host);
        }
        if let Some(auth) = &request.basic_auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, request.timeout))?;

        let status = response.status().as_u16();
        let header = |name| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let location = header(LOCATION);
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, request.timeout))?;

        debug!(path = %request.path, status = status, bytes = body.len(), "Origin responded");
        Ok(RenderResponse {
            status,
            content_type,
            location,
            body,
        })
    }
}
