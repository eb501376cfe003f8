//! # crmbatch Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The webhook transport for direct and grouped calls
//! - HTTP client with retry and backoff
//! - Configuration loading from environment and files
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements `GroupedTransport` defined in `crmbatch-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

use std::sync::Arc;

use crmbatch_core::CrmClient;
use crmbatch_domain::{ClientConfig, Result};

// Re-export commonly used items
pub use api::{ApiError, ApiErrorCategory, WebhookTransport};
pub use errors::InfraError;
pub use http::{Delivery, HttpClient, HttpClientBuilder};
pub use observability::{init_tracing, init_tracing_with};

/// Client wired to the webhook in `config`.
///
/// # Errors
///
/// Returns [`crmbatch_domain::CrmError::Config`] if the configuration is invalid.
pub fn connect(config: &ClientConfig) -> Result<CrmClient> {
    let transport = WebhookTransport::new(config)?;
    Ok(CrmClient::new(Arc::new(transport), config.pagination))
}

/// Client configured by [`config::load`].
pub fn connect_from_env() -> Result<CrmClient> {
    connect(&config::load()?)
}
