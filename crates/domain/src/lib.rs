//! # crmbatch Domain
//!
//! Value types and errors for batched access to a CRM REST API.
//!
//! This crate contains:
//! - Command, query, response and write-item value objects
//! - Domain error type and Result definition
//! - Configuration structures
//! - Protocol constants
//!
//! ## Architecture
//! - No dependencies on other crmbatch crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
