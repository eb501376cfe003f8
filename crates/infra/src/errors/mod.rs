//! Infrastructure error plumbing

mod conversions;

pub use conversions::{InfraError, HTTP_LAYER};
