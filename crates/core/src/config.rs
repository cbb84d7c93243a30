// Publisher configuration (injected into every service; no global lookups)

use crate::domain::job::DEFAULT_QUEUE;
use crate::domain::queue::validate_queue_name;
use crate::domain::traffic::PatternList;
use crate::error::{AppError, Result};
use std::time::Duration;

/// Default lease on a claimed queue record (5 minutes)
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(5 * 60);

/// Default window for strict render-token checks (5 minutes)
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default window for the coarse internal-traffic gate (120 days)
pub const DEFAULT_TRAFFIC_TOKEN_TIMEOUT: Duration = Duration::from_secs(120 * 24 * 60 * 60);

pub const DEFAULT_WORKER_COUNT: usize = 4;

pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes whose 404 response is published as a regular artifact
pub const DEFAULT_RESERVED_ROUTES: [&str; 3] = ["/", "/_snapshot/404", "/_snapshot/403"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// When false every validation returns `Disabled`
    pub enabled: bool,
    /// Validity window used by `validate`
    pub timeout: Duration,
    /// Validity window used when gating traffic observations
    pub traffic_timeout: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: DEFAULT_TOKEN_TIMEOUT,
            traffic_timeout: DEFAULT_TRAFFIC_TOKEN_TIMEOUT,
        }
    }
}

impl TokenConfig {
    /// Tokens older than this can never validate again
    pub fn retention(&self) -> Duration {
        self.timeout.max(self.traffic_timeout)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrafficConfig {
    /// Tags never stored or resolved (exact, `prefix*`, or `*` wildcard)
    pub tag_blocklist: Vec<String>,
    /// URLs never recorded (exact or `prefix*`)
    pub path_blocklist: Vec<String>,
}

/// Settings for the whole publish pipeline
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub queue: String,
    pub lease_duration: Duration,
    pub worker_count: usize,
    pub render_timeout: Duration,
    pub reserved_routes: Vec<String>,
    /// Host header sent to the origin (virtual hosting)
    pub host_override: Option<String>,
    pub basic_auth: Option<BasicAuth>,
    pub verify_tls: bool,
    /// Hostnames (optionally with `:port`) rewritten to relative URLs
    pub strip_hosts: Vec<String>,
    /// Native route of the item configured as the site front page
    pub front_page_route: Option<String>,
    pub token: TokenConfig,
    pub traffic: TrafficConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
            lease_duration: DEFAULT_LEASE_DURATION,
            worker_count: DEFAULT_WORKER_COUNT,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            reserved_routes: DEFAULT_RESERVED_ROUTES
                .iter()
                .map(|r| r.to_string())
                .collect(),
            host_override: None,
            basic_auth: None,
            verify_tls: true,
            strip_hosts: Vec::new(),
            front_page_route: None,
            token: TokenConfig::default(),
            traffic: TrafficConfig::default(),
        }
    }
}

impl PublisherConfig {
    pub fn is_reserved_route(&self, route: &str) -> bool {
        self.reserved_routes.iter().any(|r| r == route)
    }

    /// Check invariants that would otherwise surface as runtime failures
    pub fn validate(&self) -> Result<()> {
        validate_queue_name(&self.queue)?;
        if self.worker_count == 0 {
            return Err(AppError::Config("worker_count must be at least 1".to_string()));
        }
        if self.lease_duration.is_zero() {
            return Err(AppError::Config("lease_duration must be positive".to_string()));
        }
        if self.token.timeout.is_zero() || self.token.traffic_timeout.is_zero() {
            return Err(AppError::Config("token timeouts must be positive".to_string()));
        }
        PatternList::new(&self.traffic.tag_blocklist)?;
        PatternList::new(&self.traffic.path_blocklist)?;
        Ok(())
    }
}
