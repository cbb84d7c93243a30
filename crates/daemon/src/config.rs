//! Daemon configuration from `SNAPSHOT_*` environment variables

use snapshot_core::application::maintenance::DEFAULT_PURGE_INTERVAL;
use snapshot_core::config::BasicAuth;
use snapshot_core::error::{AppError, Result};
use snapshot_core::PublisherConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.snapshot/snapshot.db";
const DEFAULT_RPC_PORT: u16 = 9530;
const DEFAULT_ORIGIN_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_TRANSPORT_URL: &str = "http://127.0.0.1:8081";
const DEFAULT_FILES_ROOT: &str = ".";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_port: u16,
    pub origin_url: String,
    pub transport_url: String,
    pub transport_token: Option<String>,
    pub files_root: PathBuf,
    pub purge_interval: Duration,
    pub publisher: PublisherConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = PublisherConfig::default();

        let publisher = PublisherConfig {
            queue: env.string("SNAPSHOT_QUEUE").unwrap_or(defaults.queue),
            lease_duration: env
                .secs("SNAPSHOT_LEASE_SECS")?
                .unwrap_or(defaults.lease_duration),
            worker_count: env
                .parse("SNAPSHOT_WORKERS")?
                .unwrap_or(defaults.worker_count),
            render_timeout: env
                .secs("SNAPSHOT_RENDER_TIMEOUT_SECS")?
                .unwrap_or(defaults.render_timeout),
            reserved_routes: env
                .list("SNAPSHOT_RESERVED_ROUTES")
                .unwrap_or(defaults.reserved_routes),
            host_override: env.string("SNAPSHOT_HOST_OVERRIDE"),
            basic_auth: env.basic_auth("SNAPSHOT_BASIC_AUTH")?,
            verify_tls: env
                .flag("SNAPSHOT_VERIFY_TLS")?
                .unwrap_or(defaults.verify_tls),
            strip_hosts: env.list("SNAPSHOT_STRIP_HOSTS").unwrap_or_default(),
            front_page_route: env.string("SNAPSHOT_FRONT_PAGE"),
            token: snapshot_core::config::TokenConfig {
                enabled: env
                    .flag("SNAPSHOT_TOKENS_ENABLED")?
                    .unwrap_or(defaults.token.enabled),
                timeout: env
                    .secs("SNAPSHOT_TOKEN_TIMEOUT_SECS")?
                    .unwrap_or(defaults.token.timeout),
                traffic_timeout: env
                    .secs("SNAPSHOT_TRAFFIC_TOKEN_TIMEOUT_SECS")?
                    .unwrap_or(defaults.token.traffic_timeout),
            },
            traffic: snapshot_core::config::TrafficConfig {
                tag_blocklist: env.list("SNAPSHOT_TAG_BLOCKLIST").unwrap_or_default(),
                path_blocklist: env.list("SNAPSHOT_PATH_BLOCKLIST").unwrap_or_default(),
            },
        };
        publisher.validate()?;

        let db_path = env
            .string("SNAPSHOT_DB_PATH")
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        Ok(Self {
            db_path: shellexpand::tilde(&db_path).into_owned(),
            rpc_port: env.parse("SNAPSHOT_RPC_PORT")?.unwrap_or(DEFAULT_RPC_PORT),
            origin_url: env
                .string("SNAPSHOT_ORIGIN_URL")
                .unwrap_or_else(|| DEFAULT_ORIGIN_URL.to_string()),
            transport_url: env
                .string("SNAPSHOT_TRANSPORT_URL")
                .unwrap_or_else(|| DEFAULT_TRANSPORT_URL.to_string()),
            transport_token: env.string("SNAPSHOT_TRANSPORT_TOKEN"),
            files_root: PathBuf::from(
                shellexpand::tilde(
                    &env.string("SNAPSHOT_FILES_ROOT")
                        .unwrap_or_else(|| DEFAULT_FILES_ROOT.to_string()),
                )
                .into_owned(),
            ),
            purge_interval: env
                .secs("SNAPSHOT_PURGE_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_PURGE_INTERVAL),
            publisher,
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.contains(":memory:")
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Empty values count as unset
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| AppError::Config(format!("{}={}: {}", key, raw, e)))
            })
            .transpose()
    }

    fn secs(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self.parse::<u64>(key)?.map(Duration::from_secs))
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.string(key) {
            None => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(AppError::Config(format!("{}={}: expected a boolean", key, raw))),
            },
        }
    }

    /// Comma-separated; blank entries dropped
    fn list(&self, key: &str) -> Option<Vec<String>> {
        self.string(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    /// `user:password`
    fn basic_auth(&self, key: &str) -> Result<Option<BasicAuth>> {
        match self.string(key) {
            None => Ok(None),
            Some(raw) => match raw.split_once(':') {
                Some((username, password)) if !username.is_empty() => Ok(Some(BasicAuth {
                    username: username.to_string(),
                    password: password.to_string(),
                })),
                _ => Err(AppError::Config(format!("{} must be user:password", key))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.rpc_port, DEFAULT_RPC_PORT);
        assert!(!config.db_path.starts_with('~'));
        assert_eq!(config.publisher.worker_count, 4);
        assert_eq!(config.publisher.queue, "publish");
        assert!(config.publisher.token.enabled);
        assert!(config.transport_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SNAPSHOT_WORKERS", "8"),
            ("SNAPSHOT_STRIP_HOSTS", "example.com, www.example.com:8080,"),
            ("SNAPSHOT_TAG_BLOCKLIST", "config:*"),
            ("SNAPSHOT_BASIC_AUTH", "admin:s3:cret"),
            ("SNAPSHOT_VERIFY_TLS", "off"),
            ("SNAPSHOT_TOKEN_TIMEOUT_SECS", "60"),
            ("SNAPSHOT_DB_PATH", "sqlite::memory:"),
        ])
        .unwrap();

        assert_eq!(config.publisher.worker_count, 8);
        assert_eq!(
            config.publisher.strip_hosts,
            vec!["example.com".to_string(), "www.example.com:8080".to_string()]
        );
        assert_eq!(config.publisher.traffic.tag_blocklist, vec!["config:*".to_string()]);
        let auth = config.publisher.basic_auth.as_ref().unwrap();
        assert_eq!(auth.username, "admin");
        assert_eq!(auth.password, "s3:cret");
        assert!(!config.publisher.verify_tls);
        assert_eq!(config.publisher.token.timeout, Duration::from_secs(60));
        assert!(config.is_in_memory());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(
            load(&[("SNAPSHOT_RPC_PORT", "not-a-port")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            load(&[("SNAPSHOT_VERIFY_TLS", "maybe")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            load(&[("SNAPSHOT_BASIC_AUTH", "nopassword")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            load(&[("SNAPSHOT_WORKERS", "0")]),
            Err(AppError::Config(_))
        ));
    }
}
