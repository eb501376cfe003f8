//! Configuration structures

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BATCH_COMMAND_LIMIT, DEFAULT_PAGE_SIZE};
use crate::errors::{CrmError, Result};

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Inbound webhook base URL, e.g. `https://portal.example.com/rest/1/secret/`.
    pub webhook_url: String,
    /// Per-attempt HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per replayable HTTP call (initial try + retries). Halting
    /// write groups are always sent once.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Provider page and group limits.
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl ClientConfig {
    /// Configuration with default limits for the given webhook.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            pagination: PaginationConfig::default(),
        }
    }

    /// Check every field for values the client cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.webhook_url.trim().is_empty() {
            return Err(CrmError::Config("webhook_url must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(CrmError::Config("timeout_secs must be positive".into()));
        }
        if self.max_attempts == 0 {
            return Err(CrmError::Config("max_attempts must be at least 1".into()));
        }
        self.pagination.validate()
    }
}

/// Provider limits the pagination engine sizes its requests by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Rows returned by one list call.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Commands one grouped call may carry.
    #[serde(default = "default_batch_command_limit")]
    pub batch_command_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, batch_command_limit: DEFAULT_BATCH_COMMAND_LIMIT }
    }
}

impl PaginationConfig {
    /// Reject a zero page size and groups too small to batch anything.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(CrmError::Config("page_size must be positive".into()));
        }
        // Probe-range batching keeps one slot of every group free.
        if self.batch_command_limit < 2 {
            return Err(CrmError::Config(format!(
                "batch_command_limit must be at least 2, got {}",
                self.batch_command_limit
            )));
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> usize {
    3
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_batch_command_limit() -> usize {
    DEFAULT_BATCH_COMMAND_LIMIT
}
