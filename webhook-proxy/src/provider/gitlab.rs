//! GitLab webhooks.
//!
//! GitLab sends the configured secret token verbatim in `X-Gitlab-Token`.

use axum::body::Bytes;
use axum::http::HeaderMap;
use tracing::{debug, warn};

use super::signature::token_matches;
use super::{payload_string, required_header, Hook, Provider, ProviderKind};
use crate::error::GatewayError;

pub const X_GITLAB_TOKEN: &str = "x-gitlab-token";
pub const X_GITLAB_EVENT: &str = "x-gitlab-event";

#[derive(Debug, Default, Clone, Copy)]
pub struct GitlabProvider;

impl Provider for GitlabProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gitlab
    }

    fn extract_hook(&self, headers: &HeaderMap, payload: Bytes) -> Result<Hook, GatewayError> {
        required_header(headers, X_GITLAB_TOKEN)?;
        let event = required_header(headers, X_GITLAB_EVENT)?;

        let mut captured = HeaderMap::new();
        for name in [X_GITLAB_TOKEN, X_GITLAB_EVENT] {
            if let Some(value) = headers.get(name) {
                captured.insert(name, value.clone());
            }
        }

        debug!(event = %event, payload_length = payload.len(), "gitlab_hook_extracted");

        Ok(Hook::new(captured, payload))
    }

    fn validate(&self, hook: &Hook, secret: &str) -> Result<(), GatewayError> {
        let token = hook.header(X_GITLAB_TOKEN).unwrap_or("");
        let event = hook.header(X_GITLAB_EVENT).unwrap_or("");

        // Token is always compared, even when the event is empty.
        let token_ok = token_matches(secret, token);
        if !token_ok || event.is_empty() {
            warn!(
                has_token = !token.is_empty(),
                has_event = !event.is_empty(),
                "gitlab_token_invalid"
            );
            return Err(GatewayError::SecretMismatch);
        }

        Ok(())
    }

    fn committer(&self, hook: &Hook) -> Option<String> {
        payload_string(hook.payload(), &["user_username"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "testSecret";
    const EVENT: &str = "testEvent";
    const BODY: &[u8] = b"testBody";

    fn gitlab_hook(token: &str, event: &str, body: &'static [u8]) -> Hook {
        let mut headers = HeaderMap::new();
        headers.insert(X_GITLAB_TOKEN, HeaderValue::from_str(token).unwrap());
        headers.insert(X_GITLAB_EVENT, HeaderValue::from_str(event).unwrap());
        Hook::new(headers, Bytes::from_static(body))
    }

    fn gitlab_headers(token: &str, event: &str) -> HeaderMap {
        gitlab_hook(token, event, BODY).headers().clone()
    }

    #[test]
    fn test_extract_hook_valid() {
        let hook = GitlabProvider
            .extract_hook(&gitlab_headers(SECRET, EVENT), Bytes::from_static(BODY))
            .unwrap();
        assert_eq!(hook.header(X_GITLAB_TOKEN), Some(SECRET));
        assert_eq!(hook.header(X_GITLAB_EVENT), Some(EVENT));
        assert_eq!(hook.payload().as_ref(), BODY);
    }

    #[test]
    fn test_extract_hook_empty_token() {
        assert!(matches!(
            GitlabProvider.extract_hook(&gitlab_headers("", EVENT), Bytes::from_static(BODY)),
            Err(GatewayError::MissingHeader(X_GITLAB_TOKEN))
        ));
    }

    #[test]
    fn test_extract_hook_empty_event() {
        assert!(matches!(
            GitlabProvider.extract_hook(&gitlab_headers(SECRET, ""), Bytes::from_static(BODY)),
            Err(GatewayError::MissingHeader(X_GITLAB_EVENT))
        ));
    }

    #[test]
    fn test_extract_hook_wrong_header_keys() {
        let mut headers = HeaderMap::new();
        headers.insert("x-wrong-token", HeaderValue::from_static(SECRET));
        headers.insert("x-wrong-event", HeaderValue::from_static(EVENT));
        assert!(GitlabProvider
            .extract_hook(&headers, Bytes::from_static(BODY))
            .is_err());
    }

    #[test]
    fn test_validate() {
        assert!(GitlabProvider
            .validate(&gitlab_hook(SECRET, EVENT, BODY), SECRET)
            .is_ok());
        assert!(GitlabProvider
            .validate(&gitlab_hook(SECRET, EVENT, b""), SECRET)
            .is_ok());
    }

    #[test]
    fn test_validate_one_character_off() {
        for token in ["testSecreT", "testSecret ", "InvalidSecret", "t"] {
            assert!(matches!(
                GitlabProvider.validate(&gitlab_hook(token, EVENT, BODY), SECRET),
                Err(GatewayError::SecretMismatch)
            ));
        }
    }

    #[test]
    fn test_validate_empty_values() {
        assert!(GitlabProvider
            .validate(&gitlab_hook("", EVENT, BODY), SECRET)
            .is_err());
        assert!(GitlabProvider
            .validate(&gitlab_hook(SECRET, "", BODY), SECRET)
            .is_err());
        assert!(GitlabProvider
            .validate(&gitlab_hook(SECRET, EVENT, BODY), "")
            .is_err());
    }

    #[test]
    fn test_committer() {
        let hook = gitlab_hook(SECRET, EVENT, br#"{"object_kind":"push","user_username":"jsmith"}"#);
        assert_eq!(GitlabProvider.committer(&hook), Some("jsmith".to_string()));
        assert_eq!(GitlabProvider.committer(&gitlab_hook(SECRET, EVENT, BODY)), None);
    }
}
