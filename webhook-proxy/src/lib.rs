//! Git webhook proxy - authenticating gateway in front of an upstream service.
//!
//! This library provides the modules behind the `webhook-proxy` binary:
//! - `provider`: per-platform hook extraction and secret validation
//! - `gateway`: allow-list matching and the upstream relay
//! - `web`: the axum router, ingress and health handlers
//!
//! ## Architecture
//!
//! ```text
//! Git host → Web Server → Provider (extract + validate) → Allow-list → Relay → Upstream
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod provider;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::GatewayError;
pub use gateway::{is_allowed, AllowList, Gateway};
pub use provider::{resolve, Hook, Provider, ProviderKind};
pub use web::AppState;
