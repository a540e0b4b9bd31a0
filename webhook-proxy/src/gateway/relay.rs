//! Outbound relay to the upstream service.
//!
//! Builds the target URL, forwards the original payload and end-to-end
//! headers with `POST`, and converts the upstream reply into a response for
//! the original caller.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, Method},
    response::Response,
};
use reqwest::Client;
use tracing::{error, info};
use url::Url;

use crate::error::GatewayError;

/// The only verb the relay ever proxies.
pub const FORWARD_METHOD: Method = Method::POST;

/// Scheme assumed when the upstream URL has none.
const DEFAULT_SCHEME: &str = "http";

/// Parse the configured upstream base URL.
///
/// A URL without `scheme://` gets [`DEFAULT_SCHEME`]. The result must be an
/// absolute `http` or `https` URL with a host and no query or fragment.
pub fn upstream_base(upstream_url: &str) -> Result<Url, GatewayError> {
    let invalid = |reason: String| GatewayError::InvalidUpstreamTarget {
        url: upstream_url.to_string(),
        reason,
    };

    let raw = if upstream_url.contains("://") {
        upstream_url.to_string()
    } else {
        format!("{DEFAULT_SCHEME}://{upstream_url}")
    };

    let url = Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query or fragment not allowed".to_string()));
    }

    Ok(url)
}

/// Append the inbound path and query to the upstream base.
pub fn target_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut joined = base.path().trim_end_matches('/').to_string();
    if !path.is_empty() && !path.starts_with('/') {
        joined.push('/');
    }
    joined.push_str(path);

    let mut target = base.clone();
    target.set_path(&joined);
    target.set_query(query.filter(|q| !q.is_empty()));
    target
}

static HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || matches!(name.as_str(), "keep-alive" | "proxy-connection")
}

/// Header names listed in `Connection`, which apply to this hop only.
fn connection_tokens(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

/// Copy end-to-end headers. `host` and `content-length` are left for the
/// transport to recompute.
pub fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let listed = connection_tokens(headers);
    headers
        .iter()
        .filter(|(name, _)| {
            !is_hop_by_hop(name)
                && !listed.contains(name)
                && *name != header::HOST
                && *name != header::CONTENT_LENGTH
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// HTTP client wrapper that forwards validated hooks upstream.
#[derive(Clone)]
pub struct Relay {
    client: Client,
    timeout: Duration,
}

impl Relay {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        // Bodies and `content-encoding` pass through untouched.
        let client = Client::builder()
            .no_gzip()
            .connect_timeout(timeout)
            .build()
            .map_err(|_| GatewayError::InvalidConfiguration("failed to build HTTP client"))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `payload` to `target` and relay the reply unchanged.
    pub async fn forward(
        &self,
        target: Url,
        headers: &HeaderMap,
        payload: Bytes,
    ) -> Result<Response, GatewayError> {
        info!(
            target = %target,
            payload_length = payload.len(),
            timeout_seconds = self.timeout.as_secs_f64(),
            "relay_forward_starting"
        );

        let upstream = self
            .client
            .request(FORWARD_METHOD, target.clone())
            .timeout(self.timeout)
            .headers(end_to_end_headers(headers))
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                log_transport_error(&target, &e, self.timeout);
                GatewayError::UpstreamUnreachable(e)
            })?;

        let status = upstream.status();
        let reply_headers = end_to_end_headers(upstream.headers());

        let body = upstream.bytes().await.map_err(|e| {
            log_transport_error(&target, &e, self.timeout);
            GatewayError::UpstreamUnreachable(e)
        })?;

        info!(
            target = %target,
            status_code = status.as_u16(),
            body_length = body.len(),
            "relay_forward_complete"
        );

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = reply_headers;
        Ok(response)
    }
}

fn log_transport_error(target: &Url, e: &reqwest::Error, timeout: Duration) {
    if e.is_timeout() {
        error!(
            target = %target,
            timeout_seconds = timeout.as_secs_f64(),
            error = %e,
            "relay_forward_timeout"
        );
    } else if e.is_connect() {
        error!(target = %target, error = %e, "relay_forward_connect_error");
    } else {
        error!(target = %target, error = %e, "relay_forward_error");
    }
}
