//! Git Webhook Proxy - validates source-control webhooks and relays them upstream.
//!
//! This binary provides a small web server that:
//! - Receives webhooks from GitHub or GitLab
//! - Verifies them against the shared secret
//! - Restricts which upstream paths may be reached
//! - Forwards the original request and relays the upstream reply

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use webhook_proxy::web::{router, AppState};
use webhook_proxy::{provider, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("proxy_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        listen_address = %config.listen_address,
        upstream_url = %config.upstream_url,
        provider = %config.provider,
        allowed_paths = ?config.allowed_paths,
        ignored_users = ?config.ignored_users,
        upstream_timeout_ms = config.upstream_timeout_ms,
        "config_loaded"
    );

    // Refuse to serve with an invalid configuration
    let gateway = config.gateway().context("Invalid gateway configuration")?;

    if let Err(e) = provider::resolve(gateway.provider()) {
        warn!(error = %e, "provider_not_registered");
    }

    let state = AppState::new(gateway);
    let app = router(state, config.max_body_bytes);

    let listener = TcpListener::bind(config.listen_address)
        .await
        .context("Failed to bind to address")?;

    info!(address = %config.listen_address, "proxy_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("proxy_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("proxy_shutting_down");
}
