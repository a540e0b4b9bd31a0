//! Webhook endpoint handlers.
//!
//! The ingress handler only adapts the HTTP request to
//! [`Gateway::handle`] and turns the outcome into a response. Rejections are
//! logged here, once, with the level matching who is at fault.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::gateway::Gateway;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

/// Generic status body. Never carries diagnostic detail.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check endpoint.
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

// =============================================================================
// Webhook Ingress
// =============================================================================

/// Webhook ingress endpoint.
///
/// This endpoint:
/// 1. Validates the hook against the configured provider and secret
/// 2. Checks the path against the allow-list
/// 3. Relays the request upstream and the reply back
pub async fn proxy_webhook(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!(
        method = %method,
        path = %uri.path(),
        provider = %state.gateway.provider(),
        body_length = body.len(),
        "webhook_received"
    );

    match state.gateway.handle(&method, &uri, &headers, body).await {
        Ok(response) => {
            info!(
                path = %uri.path(),
                status_code = response.status().as_u16(),
                "webhook_relayed"
            );
            response
        }
        Err(e) => {
            if e.is_client_error() {
                warn!(
                    path = %uri.path(),
                    status_code = e.status().as_u16(),
                    error = %e,
                    "webhook_rejected"
                );
            } else {
                error!(
                    path = %uri.path(),
                    status_code = e.status().as_u16(),
                    error = %e,
                    "webhook_failed"
                );
            }
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::AllowList;
    use crate::provider::github::{X_GITHUB_EVENT, X_HUB_SIGNATURE_256};
    use crate::provider::gitlab::{X_GITLAB_EVENT, X_GITLAB_TOKEN};
    use crate::provider::signature::HmacSha256;
    use crate::web::router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use hmac::digest::KeyInit;
    use hmac::Mac;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use wiremock::matchers::{body_bytes, header, method as http_method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "testSecret";
    const EVENT: &str = "testEvent";
    const BODY: &str = "testBody";

    fn app(upstream: &str, allowed: AllowList, provider: &str) -> axum::Router {
        let gateway = Gateway::new(upstream, allowed, provider, SECRET).unwrap();
        router(AppState::new(gateway), 1_048_576)
    }

    fn gitlab_request(method: &str, uri: &str, token: &str, event: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(X_GITLAB_TOKEN, token)
            .header(X_GITLAB_EVENT, event)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_get_returns_ok() {
        let app = app("https://httpbin.org", AllowList::Unrestricted, "gitlab");
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn health_post_is_method_not_allowed() {
        let app = app("https://httpbin.org", AllowList::Unrestricted, "gitlab");
        let req = Request::builder()
            .method("POST")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn webhook_relays_upstream_reply() {
        let server = MockServer::start().await;
        Mock::given(http_method("POST"))
            .and(path("/post"))
            .and(header(X_GITLAB_EVENT, EVENT))
            .and(body_bytes(BODY.as_bytes().to_vec()))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-request-id", "abc123")
                    .set_body_string("created"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let app = app(&server.uri(), AllowList::from_entries(["/post"]), "gitlab");
        let resp = app
            .oneshot(gitlab_request("POST", "/post", SECRET, EVENT, BODY))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["x-request-id"], "abc123");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"created");
    }

    #[tokio::test]
    async fn webhook_one_character_off_secret_is_bad_request() {
        let server = MockServer::start().await;
        Mock::given(http_method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = app(&server.uri(), AllowList::Unrestricted, "gitlab");
        let resp = app
            .oneshot(gitlab_request("POST", "/post", "testSecreT", EVENT, BODY))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "invalid_secret");
        assert!(!String::from_utf8_lossy(&body).contains(SECRET));
    }

    #[tokio::test]
    async fn webhook_get_is_method_not_allowed() {
        let app = app("https://httpbin.org", AllowList::Unrestricted, "gitlab");
        let resp = app
            .oneshot(gitlab_request("GET", "/post", SECRET, EVENT, BODY))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn webhook_disallowed_path_is_forbidden() {
        let server = MockServer::start().await;
        Mock::given(http_method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = app(&server.uri(), AllowList::from_entries(["/post"]), "gitlab");
        let resp = app
            .oneshot(gitlab_request("POST", "/other", SECRET, EVENT, BODY))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn webhook_root_path_with_allow_list_is_forbidden() {
        let app = app(
            "https://httpbin.org",
            AllowList::from_entries(["/path1", "/path2"]),
            "gitlab",
        );
        let resp = app
            .oneshot(gitlab_request("POST", "/", SECRET, EVENT, BODY))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn webhook_invalid_upstream_scheme_is_server_error() {
        let app = app("htttpsss://httpbin.org", AllowList::Unrestricted, "gitlab");
        let resp = app
            .oneshot(gitlab_request("POST", "/post", SECRET, EVENT, BODY))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn webhook_github_signature_is_verified() {
        let payload = r#"{"zen":"Keep it logically awesome.","sender":{"login":"octocat"}}"#;
        let mut mac = <HmacSha256 as KeyInit>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        let server = MockServer::start().await;
        Mock::given(http_method("POST"))
            .and(path("/jenkins/github-webhook/"))
            .and(header(X_HUB_SIGNATURE_256, signature.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let app = app(&server.uri(), AllowList::Unrestricted, "github");
        let req = Request::builder()
            .method("POST")
            .uri("/jenkins/github-webhook/")
            .header(X_GITHUB_EVENT, "ping")
            .header(X_HUB_SIGNATURE_256, signature.as_str())
            .header("content-type", "application/json")
            .body(Body::from(payload))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_oversized_body_is_rejected() {
        let gateway = Gateway::new(
            "https://httpbin.org",
            AllowList::Unrestricted,
            "gitlab",
            SECRET,
        )
        .unwrap();
        let app = router(AppState::new(gateway), 8);
        let resp = app
            .oneshot(gitlab_request("POST", "/post", SECRET, EVENT, "far more than eight bytes"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
