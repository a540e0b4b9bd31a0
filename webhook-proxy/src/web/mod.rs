//! Web server module for the webhook ingress.
//!
//! This module provides the HTTP surface of the gateway:
//! - `/` and `/*path` accept webhooks and relay them upstream
//! - `/health` answers liveness probes
//!
//! All validation and forwarding happens in [`crate::gateway`].

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, proxy_webhook, AppState, StatusResponse};

/// Build the router serving `state`.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", any(proxy_webhook))
        .route("/*path", any(proxy_webhook))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
