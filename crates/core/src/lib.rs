//! # crmbatch core
//!
//! Transport-agnostic engine for a batch-capable CRM REST API.
//!
//! This crate contains:
//! - The grouped-call port and the command registry
//! - Cursor pagination with probe-range and reference-chained batching
//! - Bulk delete/update with per-item outcomes
//! - A client facade tying them to one transport
//!
//! ## Architecture Principles
//! - Only depends on `crmbatch-domain`
//! - No HTTP or platform code; the transport is a trait
//! - Pull-based: no call is made before a row or outcome is requested

pub mod batch;
pub mod bulk;
pub mod client;
pub mod pagination;

pub use batch::{CommandRegistry, ErrorMode, GroupedTransport};
pub use bulk::{BulkWrite, BulkWriter, WriteKind};
pub use client::CrmClient;
pub use pagination::{Traversal, TraversalStats};
