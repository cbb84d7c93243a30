// Render response classification

use super::rewrite::HostRewriter;
use crate::domain::PublishResult;
use crate::port::RenderResponse;
use tracing::warn;

/// Map an origin response for `route` onto a publish outcome.
///
/// 301/302 become redirects, 200 (and 404 on reserved routes) become
/// published markup with configured hosts stripped, anything else fails.
pub(crate) fn classify(
    route: &str,
    response: RenderResponse,
    reserved: bool,
    rewriter: &HostRewriter,
) -> PublishResult {
    match response.status {
        301 | 302 => match response.location.as_deref() {
            Some(location) if !location.trim().is_empty() => PublishResult::Redirected {
                destination: rewriter.canonicalize_location(location),
                status_code: response.status,
            },
            _ => {
                warn!(route = %route, status = response.status, "Redirect response without Location");
                PublishResult::failed(format!("{} redirect without Location", response.status))
            }
        },
        200 => published(response, rewriter),
        404 if reserved => published(response, rewriter),
        status => {
            warn!(route = %route, status = status, "Unexpected render status");
            PublishResult::failed(format!("unexpected status {}", status))
        }
    }
}

fn published(response: RenderResponse, rewriter: &HostRewriter) -> PublishResult {
    PublishResult::Published {
        markup: rewriter.rewrite(&response.body),
        content_type: response.content_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> HostRewriter {
        HostRewriter::new(["example.com"]).unwrap()
    }

    #[test]
    fn test_redirect_classification() {
        let result = classify("/old", RenderResponse::redirect(302, "/new"), false, &rewriter());
        assert_eq!(
            result,
            PublishResult::Redirected {
                destination: "/new".to_string(),
                status_code: 302,
            }
        );

        let result = classify(
            "/old",
            RenderResponse::redirect(301, "https://example.com/new"),
            false,
            &rewriter(),
        );
        assert_eq!(
            result,
            PublishResult::Redirected {
                destination: "/new".to_string(),
                status_code: 301,
            }
        );
    }

    #[test]
    fn test_redirect_without_location_fails() {
        let result = classify("/old", RenderResponse::status(302), false, &rewriter());
        assert!(result.is_failed());
    }

    #[test]
    fn test_ok_is_published_and_rewritten() {
        let response = RenderResponse::ok(
            r#"<a href="https://example.com/x">x</a>"#,
            "text/html; charset=UTF-8",
        );
        assert_eq!(
            classify("/page", response, false, &rewriter()),
            PublishResult::Published {
                markup: r#"<a href="/x">x</a>"#.to_string(),
                content_type: Some("text/html; charset=UTF-8".to_string()),
            }
        );
    }

    #[test]
    fn test_not_found_only_published_on_reserved_routes() {
        let mut response = RenderResponse::ok("not found", "text/html");
        response.status = 404;

        assert!(!classify("/_snapshot/404", response.clone(), true, &rewriter()).is_failed());
        assert!(classify("/missing", response, false, &rewriter()).is_failed());
    }

    #[test]
    fn test_other_statuses_fail() {
        for status in [303, 403, 500, 503] {
            assert!(classify("/x", RenderResponse::status(status), true, &rewriter()).is_failed());
        }
    }
}
