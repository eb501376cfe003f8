//! Shared test helpers for `crmbatch-core` integration tests.
//!
//! The in-memory backend mimics the provider closely enough for the engine:
//! fixed page size, counted and uncounted pages, operator filters, result-path
//! resolution inside grouped calls and both error modes.

#![allow(dead_code)]

pub mod backend;

pub use backend::{Call, FakeCrm};

/// Ids `1..=n`.
pub fn ids(n: i64) -> Vec<i64> {
    (1..=n).collect()
}

/// Integer ids of `rows`, whatever their JSON representation.
pub fn row_ids(rows: &[serde_json::Value], id_field: &str) -> Vec<i64> {
    rows.iter()
        .map(|row| crmbatch_domain::utils::row_id(row, id_field).expect("row id"))
        .collect()
}

/// Route engine events to the test harness output; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("crmbatch_core=debug"))
        .with_test_writer()
        .try_init();
}
