use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures raised by an odds feed connection.
///
/// The session layer decides between reconnecting and giving up on a group
/// based on [`FeedError::is_retryable`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("feed rejected credentials (status {status})")]
    Unauthorized { status: u16 },

    #[error("feed rejected subscription (status {status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("feed unavailable (status {status})")]
    Unavailable { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("feed timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl FeedError {
    /// Whether a reconnect attempt may succeed.
    ///
    /// Credential failures and malformed subscriptions stay broken no matter
    /// how often they are retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Unauthorized { .. } | Self::Rejected { .. })
    }

    /// Classify an HTTP status returned when opening a stream.
    #[must_use]
    pub fn from_status(status: u16, reason: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status },
            408 | 429 => Self::Unavailable { status },
            400..=499 => Self::Rejected {
                status,
                reason: reason.into(),
            },
            _ => Self::Unavailable { status },
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// True when the error came from a feed and reconnecting will not help.
    #[must_use]
    pub fn is_fatal_feed_error(&self) -> bool {
        matches!(self, Self::Feed(err) if !err.is_retryable())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
