//! Grouped call composition
//!
//! This module provides the transport port and the registry that collects the
//! commands of one grouped call.

pub mod ports;
pub mod registry;

pub use ports::{ErrorMode, GroupedTransport};
pub use registry::CommandRegistry;
