//! Tracing subscriber setup
//!
//! The library only emits `tracing` events; binaries and tests that want to
//! see them install a subscriber here.
//!
//! ## Environment Variables
//! - `CRMBATCH_LOG`: `EnvFilter` directives, e.g. `crmbatch_core=debug`
//! - `CRMBATCH_LOG_JSON`: emit one JSON object per event (true/false)

use tracing_subscriber::EnvFilter;

use crate::config::env_bool;

const ENV_LOG: &str = "CRMBATCH_LOG";
const ENV_LOG_JSON: &str = "CRMBATCH_LOG_JSON";
const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber configured from the environment.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_DIRECTIVES, env_bool(ENV_LOG_JSON, false))
}

/// Install the global subscriber, using `default_directives` when
/// `CRMBATCH_LOG` is unset or unparsable.
pub fn init_tracing_with(default_directives: &str, json: bool) -> bool {
    let filter = env_filter(default_directives);
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if json {
        builder.json().with_current_span(true).try_init().is_ok()
    } else {
        builder.compact().try_init().is_ok()
    }
}

fn env_filter(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default_directives))
}
