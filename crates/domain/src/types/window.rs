//! Identifier windows of probe-range batching

use serde_json::Value;

use super::query::FilterOp;

/// Identifier interval `(start_exclusive, end_inclusive]` fetched by one
/// batched list command.
///
/// A window may hold fewer rows than its width: deletions and replication
/// lag leave holes in the identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Identifiers must be above this value.
    pub start_exclusive: i64,
    /// Identifiers must be at most this value.
    pub end_inclusive: i64,
    /// Whether the window reaches the end of the range.
    pub is_last: bool,
}

impl PageWindow {
    /// Whether `id` falls inside the window.
    pub fn contains(&self, id: i64) -> bool {
        id > self.start_exclusive && id <= self.end_inclusive
    }

    /// Filter predicates selecting this window on `id_field`.
    pub fn predicates(&self, id_field: &str) -> [(String, Value); 2] {
        [
            (FilterOp::Gt.key(id_field), Value::from(self.start_exclusive)),
            (FilterOp::Lte.key(id_field), Value::from(self.end_inclusive)),
        ]
    }
}
