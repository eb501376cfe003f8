//! Webhook access to the CRM REST API
//!
//! # Architecture
//!
//! - [`transport::WebhookTransport`] implements the core `GroupedTransport` port
//! - [`encoder`] renders grouped-call commands as `method?query` lines
//! - [`wire`] parses direct and grouped response envelopes
//! - [`errors::ApiError`] classifies HTTP failures for logging

pub mod encoder;
pub mod errors;
pub mod transport;
pub mod wire;

pub use errors::{ApiError, ApiErrorCategory};
pub use transport::WebhookTransport;
