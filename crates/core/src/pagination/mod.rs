//! Cursor pagination over list methods
//!
//! A traversal reads the first page with a direct, counted call. Larger
//! collections are then fetched in grouped calls, using either:
//! - probe-range batching: identifier windows derived from both boundaries
//! - reference-chained batching: each page filtered on the previous page's
//!   last identifier, resolved by the provider

mod budget;
mod chained;
mod context;
mod probe_range;
mod traversal;

pub use traversal::{Traversal, TraversalStats};
