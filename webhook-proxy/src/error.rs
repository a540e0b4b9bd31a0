//! Failure taxonomy for the validation-and-forwarding pipeline.
//!
//! Every failure a request can hit maps to exactly one HTTP status. The
//! response body only carries a short code, never diagnostic detail.

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::web::StatusResponse;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required provider header is absent or empty.
    #[error("missing required header {0}")]
    MissingHeader(&'static str),

    /// Token, digest or event header failed validation.
    #[error("webhook secret does not match")]
    SecretMismatch,

    #[error("path {0:?} is not in the allow-list")]
    PathNotAllowed(String),

    #[error("method {0} is not allowed")]
    MethodNotAllowed(Method),

    /// The configured provider kind has no registered implementation.
    #[error("unknown provider {0:?}")]
    UnknownProvider(String),

    #[error("invalid upstream target {url:?}: {reason}")]
    InvalidUpstreamTarget { url: String, reason: String },

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    /// Construction-time validation failure. Never produced while serving.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingHeader(_) | GatewayError::SecretMismatch => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::PathNotAllowed(_) => StatusCode::FORBIDDEN,
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::UnknownProvider(_)
            | GatewayError::InvalidUpstreamTarget { .. }
            | GatewayError::UpstreamUnreachable(_)
            | GatewayError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short code rendered in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MissingHeader(_) => "missing_header",
            GatewayError::SecretMismatch => "invalid_secret",
            GatewayError::PathNotAllowed(_) => "path_not_allowed",
            GatewayError::MethodNotAllowed(_) => "method_not_allowed",
            GatewayError::UnknownProvider(_)
            | GatewayError::InvalidUpstreamTarget { .. }
            | GatewayError::InvalidConfiguration(_) => "misconfigured",
            GatewayError::UpstreamUnreachable(_) => "upstream_unreachable",
        }
    }

    /// Whether the failure is attributable to the caller rather than the gateway.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(StatusResponse { status: self.code() })).into_response()
    }
}
