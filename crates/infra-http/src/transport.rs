// Remote publish transport over a JSON/HTTP API (reqwest)

use crate::{endpoint, map_reqwest_error};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use snapshot_core::domain::{PublishEvent, RedirectEvent};
use snapshot_core::port::{PublishTransport, TransportError};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    /// Sent as a bearer token when set
    pub api_token: Option<String>,
    /// Directory `FileJob` paths are resolved against
    pub files_root: PathBuf,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct UnpublishBody<'a> {
    route: &'a str,
}

/// Talks to the artifact service:
/// `POST /publish`, `POST /redirect`, `POST /unpublish`, `PUT /files?path=`.
pub struct HttpPublishTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpPublishTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, endpoint(&self.config.base_url, path));
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), TransportError> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.config.timeout))?;
        self.check(response).await
    }

    async fn check(&self, response: reqwest::Response) -> Result<(), TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Resolve `relative` under `root`, refusing absolute paths and `..`
fn resolve_file(root: &Path, relative: &str) -> Result<PathBuf, TransportError> {
    let relative = Path::new(relative.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(TransportError::Io(format!(
            "Refusing path outside files root: {}",
            relative.display()
        )));
    }
    Ok(root.join(relative))
}

#[async_trait]
impl PublishTransport for HttpPublishTransport {
    async fn publish(&self, event: &PublishEvent) -> Result<(), TransportError> {
        debug!(route = %event.route, bytes = event.markup.len(), "Sending snapshot");
        self.post_json("/publish", event).await
    }

    async fn redirect(&self, event: &RedirectEvent) -> Result<(), TransportError> {
        self.post_json("/redirect", event).await
    }

    async fn unpublish(&self, route: &str) -> Result<(), TransportError> {
        self.post_json("/unpublish", &UnpublishBody { route }).await
    }

    async fn send_file(&self, path: &str) -> Result<(), TransportError> {
        let file = resolve_file(&self.config.files_root, path)?;
        let bytes = tokio::fs::read(&file)
            .await
            .map_err(|e| TransportError::Io(format!("{}: {}", file.display(), e)))?;

        debug!(path = %path, bytes = bytes.len(), "Sending file");
        let response = self
            .request(reqwest::Method::PUT, "/files")
            .query(&[("path", path)])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.config.timeout))?;
        self.check(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve_once;

    fn transport(base_url: String, files_root: PathBuf) -> HttpPublishTransport {
        HttpPublishTransport::new(TransportConfig {
            base_url,
            api_token: Some("secret".to_string()),
            files_root,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_file() {
        let root = Path::new("/srv/files");
        assert_eq!(
            resolve_file(root, "css/site.css").unwrap(),
            PathBuf::from("/srv/files/css/site.css")
        );
        assert_eq!(
            resolve_file(root, "/robots.txt").unwrap(),
            PathBuf::from("/srv/files/robots.txt")
        );
        assert!(resolve_file(root, "../etc/passwd").is_err());
        assert!(resolve_file(root, "a/../../b").is_err());
    }

    #[tokio::test]
    async fn test_publish_posts_json_with_bearer_token() {
        let (base_url, seen) =
            serve_once("HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n").await;
        let transport = transport(base_url, PathBuf::from("."));

        let event = PublishEvent {
            route: "/hello".to_string(),
            markup: "<html>hi</html>".to_string(),
            content_type: Some("text/html".to_string()),
            metadata: Default::default(),
            revision_id: None,
        };
        transport.publish(&event).await.unwrap();

        let raw = seen.await.unwrap();
        assert!(raw.starts_with("POST /publish "));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(raw.contains(r#""route":"/hello""#));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (base_url, _seen) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\nbusy",
        )
        .await;
        let transport = transport(base_url, PathBuf::from("."));

        let err = transport.unpublish("/gone").await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 503,
                message: "busy".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let transport = transport("http://127.0.0.1:1".to_string(), std::env::temp_dir());
        let err = transport
            .send_file("definitely-not-here.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
