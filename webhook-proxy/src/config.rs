//! Configuration module for environment variable parsing.
//!
//! Reads all startup configuration from environment variables. Malformed
//! optional values fall back to their defaults with a warning; required
//! values are validated by [`Gateway::new`].

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::GatewayError;
use crate::gateway::{AllowList, Gateway};

const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Address the web server listens on
    pub listen_address: SocketAddr,

    /// Upstream base URL that validated hooks are forwarded to
    pub upstream_url: String,

    /// Provider kind ("github" or "gitlab")
    pub provider: String,

    /// Shared webhook secret
    pub secret: String,

    /// Upstream paths hooks may be forwarded to
    pub allowed_paths: AllowList,

    /// Users whose hooks are acknowledged but not forwarded
    pub ignored_users: Vec<String>,

    /// Upstream request timeout in milliseconds
    pub upstream_timeout_ms: u64,

    /// Maximum accepted inbound body size in bytes
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            listen_address: parse_socket_addr("LISTEN_ADDRESS", DEFAULT_LISTEN_ADDRESS),

            upstream_url: env::var("UPSTREAM_URL").unwrap_or_default(),

            provider: env::var("PROVIDER").unwrap_or_else(|_| "github".to_string()),

            secret: env::var("SECRET").unwrap_or_default(),

            allowed_paths: parse_allow_list("ALLOWED_PATHS"),

            ignored_users: parse_csv("IGNORED_USERS").unwrap_or_default(),

            upstream_timeout_ms: parse_positive("UPSTREAM_TIMEOUT_MS", 10_000),

            max_body_bytes: parse_positive("MAX_BODY_BYTES", 5 * 1024 * 1024),
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// Build the gateway this configuration describes.
    pub fn gateway(&self) -> Result<Gateway, GatewayError> {
        Gateway::new(
            self.upstream_url.clone(),
            self.allowed_paths.clone(),
            self.provider.clone(),
            self.secret.clone(),
        )?
        .with_ignored_users(self.ignored_users.iter().cloned())
        .with_upstream_timeout(self.upstream_timeout())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_address", &self.listen_address)
            .field("upstream_url", &self.upstream_url)
            .field("provider", &self.provider)
            .field("secret", &"<redacted>")
            .field("allowed_paths", &self.allowed_paths)
            .field("ignored_users", &self.ignored_users)
            .field("upstream_timeout_ms", &self.upstream_timeout_ms)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// Parse a socket address. A bare `:port` binds every interface.
fn parse_socket_addr(name: &str, default: &str) -> SocketAddr {
    let fallback = || {
        default
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080)))
    };

    let raw = match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return fallback(),
    };

    let candidate = match raw.trim().strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => raw.trim().to_string(),
    };

    candidate.parse().unwrap_or_else(|_| {
        warn!(env_var = name, value = %raw, "Invalid listen address, using default");
        fallback()
    })
}

/// Parse a positive number, warning and falling back on anything else.
fn parse_positive<T>(name: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default,
{
    let raw = match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return default,
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid positive number, using default");
            default
        }
    }
}

/// Unset or blank forwards every path. A value with no usable entry stays
/// [`AllowList::Unset`] so gateway construction rejects it.
fn parse_allow_list(name: &str) -> AllowList {
    let raw = match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return AllowList::Unrestricted,
    };

    match parse_csv(name) {
        Some(paths) if !paths.is_empty() => AllowList::Paths(paths),
        _ => {
            warn!(env_var = name, value = %raw, "Allow-list has no paths");
            AllowList::Unset
        }
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
