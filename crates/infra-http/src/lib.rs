// Snapshot Infrastructure - HTTP Adapters
// Implements: OriginClient, PublishTransport, ContentRepository

mod content_client;
mod origin_client;
mod transport;

pub use content_client::HttpContentRepository;
pub use origin_client::{HttpOriginClient, OriginClientConfig};
pub use transport::{HttpPublishTransport, TransportConfig};

use snapshot_core::port::TransportError;
use std::time::Duration;

/// `base` + `path` without doubled or missing slashes
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// reqwest errors -> TransportError; `timeout` is reported for timeouts
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout.as_millis() as u64)
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_decode() || err.is_body() {
        TransportError::InvalidResponse(err.to_string())
    } else {
        TransportError::Connect(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        assert_eq!(endpoint("http://origin/", "/about"), "http://origin/about");
        assert_eq!(endpoint("http://origin", "about"), "http://origin/about");
        assert_eq!(endpoint("http://origin/base/", "/"), "http://origin/base/");
    }
}
