// Snapshot Publisher - render, classify and ship routes to the remote transport
//
// Per job: Pending -> Rendering -> {Published, Redirected, Unpublished, Failed}

mod classify;
mod rewrite;

pub use rewrite::HostRewriter;

use crate::application::metadata::MetadataRegistry;
use crate::application::token::TokenStore;
use crate::config::PublisherConfig;
use crate::domain::{ContentItem, Metadata, PublishEvent, PublishResult, RedirectEvent};
use crate::error::{AppError, Result};
use crate::port::{ContentRepository, OriginClient, PublishTransport, RenderRequest, TransportError};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SnapshotPublisher {
    config: PublisherConfig,
    tokens: Arc<TokenStore>,
    origin: Arc<dyn OriginClient>,
    transport: Arc<dyn PublishTransport>,
    content: Arc<dyn ContentRepository>,
    metadata: MetadataRegistry,
    rewriter: HostRewriter,
}

impl SnapshotPublisher {
    pub fn new(
        config: PublisherConfig,
        tokens: Arc<TokenStore>,
        origin: Arc<dyn OriginClient>,
        transport: Arc<dyn PublishTransport>,
        content: Arc<dyn ContentRepository>,
        metadata: MetadataRegistry,
    ) -> Result<Self> {
        let rewriter = HostRewriter::new(&config.strip_hosts)
            .map_err(|e| AppError::Config(format!("Invalid strip host: {}", e)))?;
        Ok(Self {
            config,
            tokens,
            origin,
            transport,
            content,
            metadata,
            rewriter,
        })
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Render `route` through the origin and classify the response.
    ///
    /// Connectivity problems become `Failed`; only token storage errors
    /// are returned as `Err`.
    pub async fn render(&self, route: &str, revision_id: Option<&str>) -> Result<PublishResult> {
        let token = self.tokens.issue(route).await?;
        let request = RenderRequest {
            path: route.to_string(),
            token,
            revision_id: revision_id.map(str::to_string),
            host: self.config.host_override.clone(),
            basic_auth: self.config.basic_auth.clone(),
            timeout: self.config.render_timeout,
        };

        debug!(route = %route, revision = ?revision_id, "Rendering");
        let response = match self.origin.render(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(route = %route, error = %e, "Origin unreachable");
                return Ok(PublishResult::failed(e.to_string()));
            }
        };

        Ok(classify::classify(
            route,
            response,
            self.config.is_reserved_route(route),
            &self.rewriter,
        ))
    }

    /// Publish a bare route (no content item metadata)
    pub async fn publish_route(&self, route: &str) -> Result<PublishResult> {
        let result = self.render(route, None).await?;
        let result = self.ship(route, result, Metadata::new(), None).await;
        log_result(route, &result);
        Ok(result)
    }

    /// Publish every matching translation of a content item.
    ///
    /// A missing item yields no results. Unpublished translations are
    /// withdrawn from the remote.
    pub async fn publish_content_item(
        &self,
        item_id: &str,
        revision_id: Option<&str>,
        language_filter: &[String],
    ) -> Result<Vec<PublishResult>> {
        let items = self.content.load(item_id, revision_id).await?;
        if items.is_empty() {
            warn!(item_id = %item_id, "Content item not found, skipping");
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for item in items
            .iter()
            .filter(|i| language_filter.is_empty() || language_filter.contains(&i.language))
        {
            let result = self.publish_translation(item, revision_id).await?;
            log_result(&item.route, &result);
            results.push(result);
        }
        Ok(results)
    }

    async fn publish_translation(
        &self,
        item: &ContentItem,
        revision_id: Option<&str>,
    ) -> Result<PublishResult> {
        if !item.published {
            return Ok(self.unpublish(&item.route).await);
        }

        let is_front_page = self.is_front_page(item);
        let target = if is_front_page { "/" } else { item.route.as_str() };

        let result = self.render(target, revision_id).await?;
        let metadata = self.metadata.build(item, Some(item.language.as_str()));
        let revision = item
            .revision_id
            .clone()
            .or_else(|| revision_id.map(str::to_string));
        let result = self.ship(target, result, metadata, revision).await;

        if matches!(result, PublishResult::Published { .. }) && item.default_revision {
            if let Some(event) = self.alias_redirect(item, is_front_page) {
                if let Err(e) = self.transport.redirect(&event).await {
                    warn!(source = %event.source, error = %e, "Failed to publish alias redirect");
                    return Ok(PublishResult::failed(e.to_string()));
                }
            }
        }
        Ok(result)
    }

    /// Permanent redirect from the raw route to the canonical one
    fn alias_redirect(&self, item: &ContentItem, is_front_page: bool) -> Option<RedirectEvent> {
        if is_front_page {
            return (item.internal_route != "/")
                .then(|| RedirectEvent::permanent(item.internal_route.clone(), "/"));
        }
        item.is_aliased()
            .then(|| RedirectEvent::permanent(item.internal_route.clone(), item.route.clone()))
    }

    fn is_front_page(&self, item: &ContentItem) -> bool {
        self.config
            .front_page_route
            .as_deref()
            .is_some_and(|front| front == item.internal_route || front == item.route)
    }

    /// Emit a redirect, or withdraw it when `status_code` is 0.
    ///
    /// When `previous_source` differs from `source` the old path is
    /// unpublished first.
    pub async fn publish_redirect(
        &self,
        source: &str,
        destination: &str,
        status_code: u16,
        previous_source: Option<&str>,
    ) -> PublishResult {
        if let Some(previous) = previous_source.filter(|p| *p != source) {
            let result = self.unpublish(previous).await;
            if result.is_failed() {
                return result;
            }
        }

        if status_code == 0 {
            return self.unpublish(source).await;
        }

        let event = RedirectEvent::new(
            source,
            self.rewriter.canonicalize_location(destination),
            status_code,
        );
        match self.transport.redirect(&event).await {
            Ok(()) => {
                info!(source = %source, destination = %event.destination, "Redirect published");
                PublishResult::Redirected {
                    destination: event.destination,
                    status_code,
                }
            }
            Err(e) => transport_failure(source, e),
        }
    }

    /// Remove whatever is published at `route`
    pub async fn unpublish(&self, route: &str) -> PublishResult {
        match self.transport.unpublish(route).await {
            Ok(()) => {
                info!(route = %route, "Unpublished");
                PublishResult::Unpublished
            }
            Err(e) => transport_failure(route, e),
        }
    }

    pub async fn publish_file(&self, path: &str) -> std::result::Result<(), TransportError> {
        self.transport.send_file(path).await.map_err(|e| {
            warn!(path = %path, error = %e, "Failed to send file");
            e
        })
    }

    /// Hand a classified render result to the transport
    async fn ship(
        &self,
        route: &str,
        result: PublishResult,
        metadata: Metadata,
        revision_id: Option<String>,
    ) -> PublishResult {
        match result {
            PublishResult::Published {
                markup,
                content_type,
            } => {
                let event = PublishEvent {
                    route: route.to_string(),
                    markup,
                    content_type,
                    metadata,
                    revision_id,
                };
                match self.transport.publish(&event).await {
                    Ok(()) => PublishResult::Published {
                        markup: event.markup,
                        content_type: event.content_type,
                    },
                    Err(e) => transport_failure(route, e),
                }
            }
            PublishResult::Redirected {
                destination,
                status_code,
            } => {
                let event = RedirectEvent::new(route, destination, status_code);
                match self.transport.redirect(&event).await {
                    Ok(()) => PublishResult::Redirected {
                        destination: event.destination,
                        status_code,
                    },
                    Err(e) => transport_failure(route, e),
                }
            }
            other => other,
        }
    }
}

fn transport_failure(route: &str, error: TransportError) -> PublishResult {
    warn!(route = %route, error = %error, "Transport failure");
    PublishResult::failed(error.to_string())
}

fn log_result(route: &str, result: &PublishResult) {
    match result {
        PublishResult::Failed { reason } => {
            warn!(route = %route, state = result.state(), reason = %reason, "Snapshot not published")
        }
        _ => info!(route = %route, state = result.state(), "Snapshot job finished"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::domain::ValidationResult;
    use crate::port::content::mocks::InMemoryContentRepository;
    use crate::port::origin::mocks::ScriptedOrigin;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use crate::port::token_repository::mocks::InMemoryTokenRepository;
    use crate::port::transport::mocks::{RecordingTransport, TransportCall};
    use crate::port::RenderResponse;

    struct Fixture {
        publisher: SnapshotPublisher,
        tokens: Arc<TokenStore>,
        origin: Arc<ScriptedOrigin>,
        transport: Arc<RecordingTransport>,
        content: Arc<InMemoryContentRepository>,
    }

    fn fixture(config: PublisherConfig) -> Fixture {
        let tokens = Arc::new(TokenStore::new(
            Arc::new(InMemoryTokenRepository::new()),
            Arc::new(ManualTimeProvider::new(1_000)),
            TokenConfig::default(),
        ));
        let origin = Arc::new(ScriptedOrigin::new());
        let transport = Arc::new(RecordingTransport::new());
        let content = Arc::new(InMemoryContentRepository::new());
        let publisher = SnapshotPublisher::new(
            config,
            tokens.clone(),
            origin.clone(),
            transport.clone(),
            content.clone(),
            MetadataRegistry::with_defaults(),
        )
        .unwrap();
        Fixture {
            publisher,
            tokens,
            origin,
            transport,
            content,
        }
    }

    #[tokio::test]
    async fn test_publish_route() {
        let f = fixture(PublisherConfig::default());
        f.origin
            .respond("/hello", RenderResponse::ok("<html>hi</html>", "text/html"));

        let result = f.publisher.publish_route("/hello").await.unwrap();
        assert!(matches!(result, PublishResult::Published { .. }));

        let published = f.transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].route, "/hello");
        assert_eq!(published[0].markup, "<html>hi</html>");
        assert_eq!(published[0].revision_id, None);
    }

    #[tokio::test]
    async fn test_render_request_carries_valid_token() {
        let config = PublisherConfig {
            host_override: Some("www.example.com".to_string()),
            ..Default::default()
        };
        let f = fixture(config);
        f.origin.respond("/a", RenderResponse::ok("a", "text/html"));

        f.publisher.render("/a", Some("42")).await.unwrap();

        let request = &f.origin.requests()[0];
        assert_eq!(request.host.as_deref(), Some("www.example.com"));
        assert_eq!(request.revision_id.as_deref(), Some("42"));
        assert_eq!(
            f.tokens.validate(&request.token, "/a", true).await.unwrap(),
            ValidationResult::Valid
        );
    }

    #[tokio::test]
    async fn test_redirect_response_emits_redirect_only() {
        let f = fixture(PublisherConfig::default());
        f.origin.respond("/old", RenderResponse::redirect(302, "/new"));

        let result = f.publisher.publish_route("/old").await.unwrap();
        assert_eq!(
            result,
            PublishResult::Redirected {
                destination: "/new".to_string(),
                status_code: 302,
            }
        );
        assert!(f.transport.published().is_empty());
        assert_eq!(f.transport.redirects(), vec![RedirectEvent::new("/old", "/new", 302)]);
    }

    #[tokio::test]
    async fn test_unexpected_status_and_unreachable_origin_fail() {
        let f = fixture(PublisherConfig::default());
        f.origin.respond("/broken", RenderResponse::status(500));
        f.origin
            .fail("/down", TransportError::Connect("refused".to_string()));

        assert!(f.publisher.publish_route("/broken").await.unwrap().is_failed());
        assert!(f.publisher.publish_route("/down").await.unwrap().is_failed());
        assert!(f.publisher.publish_route("/missing").await.unwrap().is_failed());
        assert!(f.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reserved_not_found_route_is_published() {
        let f = fixture(PublisherConfig::default());
        let mut response = RenderResponse::ok("gone", "text/html");
        response.status = 404;
        f.origin.respond("/_snapshot/404", response);

        let result = f.publisher.publish_route("/_snapshot/404").await.unwrap();
        assert!(matches!(result, PublishResult::Published { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_reported_as_failed() {
        let f = fixture(PublisherConfig::default());
        f.origin.respond("/a", RenderResponse::ok("a", "text/html"));
        f.transport
            .fail_with(Some(TransportError::Timeout(30_000)));

        let result = f.publisher.publish_route("/a").await.unwrap();
        assert!(result.is_failed());
    }

    #[tokio::test]
    async fn test_content_item_publishes_with_alias_redirect() {
        let f = fixture(PublisherConfig::default());
        let mut item = ContentItem::new("1", "en", "About", "/about", "/node/1");
        item.revision_id = Some("7".to_string());
        f.content.put(item);
        f.origin.respond("/about", RenderResponse::ok("about", "text/html"));

        let results = f.publisher.publish_content_item("1", None, &[]).await.unwrap();
        assert_eq!(results.len(), 1);

        let published = f.transport.published();
        assert_eq!(published[0].route, "/about");
        assert_eq!(published[0].revision_id.as_deref(), Some("7"));
        assert_eq!(published[0].metadata["title"], serde_json::json!("About"));
        assert_eq!(
            f.transport.redirects(),
            vec![RedirectEvent::permanent("/node/1", "/about")]
        );
    }

    #[tokio::test]
    async fn test_non_default_revision_gets_no_alias_redirect() {
        let f = fixture(PublisherConfig::default());
        let mut item = ContentItem::new("1", "en", "About", "/about", "/node/1");
        item.revision_id = Some("7".to_string());
        f.content.put(item);
        f.origin.respond("/about", RenderResponse::ok("draft", "text/html"));

        f.publisher
            .publish_content_item("1", Some("8"), &[])
            .await
            .unwrap();

        assert_eq!(f.transport.published()[0].revision_id.as_deref(), Some("8"));
        assert!(f.transport.redirects().is_empty());
        assert_eq!(f.origin.requests()[0].revision_id.as_deref(), Some("8"));
    }

    #[tokio::test]
    async fn test_front_page_published_at_root() {
        let config = PublisherConfig {
            front_page_route: Some("/node/1".to_string()),
            ..Default::default()
        };
        let f = fixture(config);
        f.content
            .put(ContentItem::new("1", "en", "Home", "/home", "/node/1"));
        f.origin.respond("/", RenderResponse::ok("home", "text/html"));

        f.publisher.publish_content_item("1", None, &[]).await.unwrap();

        assert_eq!(f.transport.published()[0].route, "/");
        assert_eq!(
            f.transport.redirects(),
            vec![RedirectEvent::permanent("/node/1", "/")]
        );
    }

    #[tokio::test]
    async fn test_unpublished_translation_is_withdrawn() {
        let f = fixture(PublisherConfig::default());
        f.content
            .put(ContentItem::new("1", "en", "Hi", "/hi", "/node/1"));
        let mut french = ContentItem::new("1", "fr", "Salut", "/fr/salut", "/fr/node/1");
        french.published = false;
        f.content.put(french);
        f.origin.respond("/hi", RenderResponse::ok("hi", "text/html"));

        let results = f.publisher.publish_content_item("1", None, &[]).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(f.transport.unpublished(), vec!["/fr/salut".to_string()]);

        let results = f
            .publisher
            .publish_content_item("1", None, &["fr".to_string()])
            .await
            .unwrap();
        assert_eq!(results, vec![PublishResult::Unpublished]);
    }

    #[tokio::test]
    async fn test_missing_content_item_is_skipped() {
        let f = fixture(PublisherConfig::default());
        let results = f.publisher.publish_content_item("404", None, &[]).await.unwrap();
        assert!(results.is_empty());
        assert!(f.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_redirect_move_and_withdrawal() {
        let f = fixture(PublisherConfig::default());

        let result = f
            .publisher
            .publish_redirect("/new-source", "/target", 301, Some("/old-source"))
            .await;
        assert!(matches!(result, PublishResult::Redirected { .. }));
        assert_eq!(
            f.transport.calls(),
            vec![
                TransportCall::Unpublish("/old-source".to_string()),
                TransportCall::Redirect(RedirectEvent::new("/new-source", "/target", 301)),
            ]
        );

        let result = f.publisher.publish_redirect("/gone", "/target", 0, None).await;
        assert_eq!(result, PublishResult::Unpublished);
        assert_eq!(f.transport.unpublished().last().unwrap(), "/gone");
    }
}
