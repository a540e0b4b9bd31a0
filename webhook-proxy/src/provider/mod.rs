//! Source-control providers.
//!
//! A provider knows one platform's header conventions and signing scheme.
//! It turns an inbound request into a [`Hook`] and validates that hook
//! against the shared secret.
//!
//! ## Flow
//!
//! ```text
//! resolve(kind) → Provider::extract_hook(headers, body) → Provider::validate(hook, secret)
//! ```

pub mod github;
pub mod gitlab;
pub mod signature;

use std::fmt;
use std::str::FromStr;

use axum::body::Bytes;
use axum::http::HeaderMap;

use crate::error::GatewayError;

pub use github::GithubProvider;
pub use gitlab::GitlabProvider;

/// The provider-relevant headers and raw payload of one inbound call.
///
/// Header lookup is case-insensitive. A hook is immutable once extracted.
#[derive(Debug, Clone)]
pub struct Hook {
    headers: HeaderMap,
    payload: Bytes,
}

impl Hook {
    pub fn new(headers: HeaderMap, payload: Bytes) -> Self {
        Self { headers, payload }
    }

    /// Value of a captured header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// Supported platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Github,
    Gitlab,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Github => "github",
            ProviderKind::Gitlab => "gitlab",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(ProviderKind::Github),
            "gitlab" => Ok(ProviderKind::Gitlab),
            other => Err(GatewayError::UnknownProvider(other.to_string())),
        }
    }
}

/// Capability implemented once per platform.
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Capture the provider headers and payload of an inbound request.
    ///
    /// Fails with [`GatewayError::MissingHeader`] when a required header is
    /// absent or empty.
    fn extract_hook(&self, headers: &HeaderMap, payload: Bytes) -> Result<Hook, GatewayError>;

    /// Check the hook against the shared secret.
    ///
    /// Fails with [`GatewayError::SecretMismatch`]. Comparisons run in
    /// constant time.
    fn validate(&self, hook: &Hook, secret: &str) -> Result<(), GatewayError>;

    /// User name that triggered the event, read from the JSON payload.
    fn committer(&self, hook: &Hook) -> Option<String>;
}

static GITHUB: GithubProvider = GithubProvider;
static GITLAB: GitlabProvider = GitlabProvider;

/// Look up the provider registered for `name`.
pub fn resolve(name: &str) -> Result<&'static dyn Provider, GatewayError> {
    let provider: &'static dyn Provider = match name.parse::<ProviderKind>()? {
        ProviderKind::Github => &GITHUB,
        ProviderKind::Gitlab => &GITLAB,
    };
    Ok(provider)
}

/// Read a header that must be present and non-empty.
pub(crate) fn required_header<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, GatewayError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingHeader(name))
}

/// Follow a chain of object keys through a JSON payload to a string leaf.
pub(crate) fn payload_string(payload: &[u8], keys: &[&str]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    keys.iter()
        .try_fold(&value, |v, key| v.get(key))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
