//! Error types used throughout the client

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for crmbatch
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum CrmError {
    /// More commands were registered than one grouped call can carry.
    #[error("Batch capacity exceeded: at most {limit} commands per grouped call")]
    CapacityExceeded { limit: usize },

    /// A caller-supplied argument has the wrong JSON type, e.g. a non-integer id.
    #[error("Invalid argument at index {index}: unexpected {kind} {value}")]
    InvalidArgumentKind { index: usize, value: String, kind: String },

    /// The transport or the remote backend rejected a call.
    #[error("Remote call {method} failed: {message}")]
    RemoteCall { method: String, message: String },

    /// A bulk write batch failed for a reason other than argument validation.
    #[error("Batch execution failed: {summary}")]
    BatchExecution {
        summary: String,
        #[source]
        cause: Box<CrmError>,
    },

    /// The query cannot be paginated as given.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The response does not have the expected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Engine bug; never caused by caller input.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrmError {
    /// Shorthand for a [`CrmError::RemoteCall`].
    pub fn remote(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteCall { method: method.into(), message: message.into() }
    }

    /// Wrap `cause` into a [`CrmError::BatchExecution`].
    pub fn batch_execution(summary: impl Into<String>, cause: CrmError) -> Self {
        Self::BatchExecution { summary: summary.into(), cause: Box::new(cause) }
    }

    /// Caller errors that are raised before any network activity.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidArgumentKind { .. } | Self::InvalidQuery(_))
    }

    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::InvalidArgumentKind { .. } => "invalid_argument_kind",
            Self::RemoteCall { .. } => "remote_call",
            Self::BatchExecution { .. } => "batch_execution",
            Self::InvalidQuery(_) => "invalid_query",
            Self::Config(_) => "config",
            Self::Protocol(_) => "protocol",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for crmbatch operations
pub type Result<T> = std::result::Result<T, CrmError>;
