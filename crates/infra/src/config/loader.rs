//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the webhook URL is not set, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CRMBATCH_WEBHOOK_URL`: Inbound webhook base URL (required)
//! - `CRMBATCH_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `CRMBATCH_MAX_ATTEMPTS`: Attempts per HTTP call, including the first
//! - `CRMBATCH_PAGE_SIZE`: Rows per list page
//! - `CRMBATCH_BATCH_LIMIT`: Commands per grouped call
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./crmbatch.json` or `./crmbatch.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crmbatch_domain::{ClientConfig, CrmError, Result};

use crate::errors::InfraError;

const ENV_WEBHOOK_URL: &str = "CRMBATCH_WEBHOOK_URL";
const ENV_TIMEOUT_SECS: &str = "CRMBATCH_TIMEOUT_SECS";
const ENV_MAX_ATTEMPTS: &str = "CRMBATCH_MAX_ATTEMPTS";
const ENV_PAGE_SIZE: &str = "CRMBATCH_PAGE_SIZE";
const ENV_BATCH_LIMIT: &str = "CRMBATCH_BATCH_LIMIT";

const FILE_NAMES: [&str; 4] = ["crmbatch.json", "crmbatch.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the webhook URL is
/// not set there, falls back to loading from a config file.
///
/// # Errors
/// Returns `CrmError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<ClientConfig> {
    if std::env::var_os(ENV_WEBHOOK_URL).is_none() {
        tracing::debug!("webhook URL not set in environment, trying file");
        return load_from_file(None);
    }

    let config = load_from_env()?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `CRMBATCH_WEBHOOK_URL` is required; limits default to the provider's.
///
/// # Errors
/// Returns `CrmError::Config` if the webhook URL is missing or a numeric
/// variable does not parse.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::new(env_var(ENV_WEBHOOK_URL)?);

    if let Some(timeout) = env_parse(ENV_TIMEOUT_SECS)? {
        config.timeout_secs = timeout;
    }
    if let Some(attempts) = env_parse(ENV_MAX_ATTEMPTS)? {
        config.max_attempts = attempts;
    }
    if let Some(page_size) = env_parse(ENV_PAGE_SIZE)? {
        config.pagination.page_size = page_size;
    }
    if let Some(limit) = env_parse(ENV_BATCH_LIMIT)? {
        config.pagination.batch_command_limit = limit;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CrmError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CrmError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CrmError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CrmError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| CrmError::from(InfraError::from(e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CrmError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CrmError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `CrmError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| CrmError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional numeric environment variable.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CrmError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
pub(crate) fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
