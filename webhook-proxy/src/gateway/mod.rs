//! Validation-and-forwarding pipeline.
//!
//! ## Flow
//!
//! ```text
//! method check → resolve provider → extract hook → validate secret
//!     → allow-list → ignored users → relay upstream → relay reply
//! ```
//!
//! Any step failing aborts the rest and maps to a status via
//! [`GatewayError::status`].

pub mod paths;
pub mod relay;

use std::collections::HashSet;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::error::GatewayError;
use crate::provider;
use crate::web::StatusResponse;

pub use paths::is_allowed;
pub use relay::{Relay, FORWARD_METHOD};

/// Default bound on one upstream call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Configured path restriction.
///
/// `Unset` is distinct from `Unrestricted`: the former is a configuration
/// mistake, the latter an explicit "forward every path".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowList {
    #[default]
    Unset,
    Unrestricted,
    Paths(Vec<String>),
}

impl AllowList {
    /// An empty collection means every path is allowed.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = entries.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            AllowList::Unrestricted
        } else {
            AllowList::Paths(paths)
        }
    }
}

impl From<Option<Vec<String>>> for AllowList {
    fn from(entries: Option<Vec<String>>) -> Self {
        entries.map_or(AllowList::Unset, AllowList::from_entries)
    }
}

/// A validated gateway, shared read-only by every request handler.
pub struct Gateway {
    upstream_url: String,
    allowed_paths: Vec<String>,
    provider: String,
    secret: String,
    ignored_users: HashSet<String>,
    relay: Relay,
}

impl Gateway {
    /// Validate the configuration and build a gateway.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidConfiguration`] when the upstream URL, provider
    /// or secret is empty, or the allow-list is [`AllowList::Unset`].
    pub fn new(
        upstream_url: impl Into<String>,
        allowed_paths: AllowList,
        provider: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let upstream_url = upstream_url.into();
        let provider = provider.into();
        let secret = secret.into();

        if upstream_url.trim().is_empty() {
            return Err(GatewayError::InvalidConfiguration("upstream URL cannot be empty"));
        }
        let allowed_paths = match allowed_paths {
            AllowList::Unset => {
                return Err(GatewayError::InvalidConfiguration("allowed paths are not set"))
            }
            AllowList::Unrestricted => Vec::new(),
            AllowList::Paths(paths) => paths,
        };
        if provider.trim().is_empty() {
            return Err(GatewayError::InvalidConfiguration("provider cannot be empty"));
        }
        if secret.is_empty() {
            return Err(GatewayError::InvalidConfiguration("secret cannot be empty"));
        }

        Ok(Self {
            upstream_url,
            allowed_paths,
            provider,
            secret,
            ignored_users: HashSet::new(),
            relay: Relay::new(DEFAULT_UPSTREAM_TIMEOUT)?,
        })
    }

    /// Acknowledge hooks from these users without forwarding them.
    #[must_use]
    pub fn with_ignored_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_users = users
            .into_iter()
            .map(Into::into)
            .filter(|u: &String| !u.is_empty())
            .collect();
        self
    }

    /// Bound each upstream call by `timeout`.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Result<Self, GatewayError> {
        self.relay = Relay::new(timeout)?;
        Ok(self)
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    pub fn allowed_paths(&self) -> &[String] {
        &self.allowed_paths
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn ignored_users(&self) -> &HashSet<String> {
        &self.ignored_users
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.relay.timeout()
    }

    /// Run one inbound webhook through the pipeline.
    pub async fn handle(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        payload: Bytes,
    ) -> Result<Response, GatewayError> {
        if *method != FORWARD_METHOD {
            return Err(GatewayError::MethodNotAllowed(method.clone()));
        }

        // Server-side configuration faults win over any client fault.
        let provider = provider::resolve(&self.provider)?;
        let base = relay::upstream_base(&self.upstream_url)?;

        let hook = provider.extract_hook(headers, payload)?;
        provider.validate(&hook, &self.secret)?;

        let path = uri.path();
        if !is_allowed(&self.allowed_paths, path) {
            return Err(GatewayError::PathNotAllowed(path.to_string()));
        }

        if !self.ignored_users.is_empty() {
            if let Some(committer) = provider.committer(&hook) {
                if self.ignored_users.contains(&committer) {
                    info!(
                        provider = %provider.kind(),
                        committer = %committer,
                        path = %path,
                        "webhook_ignored_user"
                    );
                    return Ok((
                        StatusCode::OK,
                        Json(StatusResponse { status: "ignored" }),
                    )
                        .into_response());
                }
            }
        }

        let target = relay::target_url(&base, path, uri.query());
        self.relay
            .forward(target, headers, hook.payload().clone())
            .await
    }
}
