//! GitHub webhooks.
//!
//! GitHub signs the raw payload with HMAC-SHA256 (`X-Hub-Signature-256`).
//! Older integrations only send the HMAC-SHA1 `X-Hub-Signature`, which is
//! accepted when the SHA-256 header is absent.

use axum::body::Bytes;
use axum::http::HeaderMap;
use tracing::{debug, warn};

use super::signature::{verify_hmac_sha1, verify_hmac_sha256};
use super::{payload_string, required_header, Hook, Provider, ProviderKind};
use crate::error::GatewayError;

pub const X_GITHUB_EVENT: &str = "x-github-event";
pub const X_GITHUB_DELIVERY: &str = "x-github-delivery";
pub const X_HUB_SIGNATURE_256: &str = "x-hub-signature-256";
pub const X_HUB_SIGNATURE: &str = "x-hub-signature";

#[derive(Debug, Default, Clone, Copy)]
pub struct GithubProvider;

impl Provider for GithubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Github
    }

    fn extract_hook(&self, headers: &HeaderMap, payload: Bytes) -> Result<Hook, GatewayError> {
        let event = required_header(headers, X_GITHUB_EVENT)?;

        let signature_header = if required_header(headers, X_HUB_SIGNATURE_256).is_ok() {
            X_HUB_SIGNATURE_256
        } else if required_header(headers, X_HUB_SIGNATURE).is_ok() {
            X_HUB_SIGNATURE
        } else {
            return Err(GatewayError::MissingHeader(X_HUB_SIGNATURE_256));
        };

        let mut captured = HeaderMap::new();
        for name in [X_GITHUB_EVENT, signature_header, X_GITHUB_DELIVERY] {
            if let Some(value) = headers.get(name) {
                captured.insert(name, value.clone());
            }
        }

        debug!(
            event = %event,
            signature_header = signature_header,
            payload_length = payload.len(),
            "github_hook_extracted"
        );

        Ok(Hook::new(captured, payload))
    }

    fn validate(&self, hook: &Hook, secret: &str) -> Result<(), GatewayError> {
        if hook.header(X_GITHUB_EVENT).map_or(true, str::is_empty) {
            return Err(GatewayError::SecretMismatch);
        }

        let valid = if let Some(sig) = hook.header(X_HUB_SIGNATURE_256) {
            sig.strip_prefix("sha256=")
                .is_some_and(|hex| verify_hmac_sha256(secret, hook.payload(), hex))
        } else if let Some(sig) = hook.header(X_HUB_SIGNATURE) {
            sig.strip_prefix("sha1=")
                .is_some_and(|hex| verify_hmac_sha1(secret, hook.payload(), hex))
        } else {
            false
        };

        if !valid {
            warn!(
                delivery = hook.header(X_GITHUB_DELIVERY).unwrap_or(""),
                "github_signature_invalid"
            );
            return Err(GatewayError::SecretMismatch);
        }

        Ok(())
    }

    fn committer(&self, hook: &Hook) -> Option<String> {
        payload_string(hook.payload(), &["sender", "login"])
    }
}
