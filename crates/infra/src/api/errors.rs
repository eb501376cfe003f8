//! API-specific error types
//!
//! Classifies transport failures so they can be logged with a category before
//! being surfaced as [`CrmError::RemoteCall`].

use std::time::Duration;

use crmbatch_domain::CrmError;
use reqwest::StatusCode;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401, 403): webhook secret revoked or scope missing
    Authentication,
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx except auth), including method-level API errors
    Client,
    /// Network/connection errors
    Network,
    /// Configuration errors
    Config,
}

impl ApiErrorCategory {
    /// Stable label used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::Server => "server",
            Self::Client => "client",
            Self::Network => "network",
            Self::Config => "config",
        }
    }
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401 or 403.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// HTTP 429.
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// HTTP 5xx.
    #[error("Server error: {0}")]
    Server(String),

    /// Other HTTP 4xx, or a request that could not be built.
    #[error("Client error: {0}")]
    Client(String),

    /// Connection-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No answer within the timeout.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Whether the HTTP layer retries this kind of failure.
    ///
    /// Rate limiting is reported, not retried.
    pub fn is_transient(&self) -> bool {
        matches!(self.category(), ApiErrorCategory::Server | ApiErrorCategory::Network)
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, url: &str, detail: &str) -> Self {
        let message = if detail.is_empty() {
            format!("{url} returned status {status}")
        } else {
            format!("{url} returned status {status}: {detail}")
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Auth(message)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimit(message)
        } else if status.is_server_error() {
            Self::Server(message)
        } else if status.is_client_error() {
            Self::Client(message)
        } else {
            Self::Network(message)
        }
    }

    /// Classify an error raised by the HTTP client.
    pub fn from_crm(err: CrmError) -> Self {
        match err {
            CrmError::RemoteCall { message, .. } => Self::Network(message),
            CrmError::Config(message) => Self::Config(message),
            other => Self::Client(other.to_string()),
        }
    }

    /// Surface as a domain error attributed to `method`.
    pub fn into_crm(self, method: &str) -> CrmError {
        match self {
            Self::Config(message) => CrmError::Config(message),
            other => CrmError::remote(method, other.to_string()),
        }
    }
}
