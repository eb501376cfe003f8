//! Helpers over loosely typed response payloads

pub mod ids;

pub use ids::{parse_id, row_id};
