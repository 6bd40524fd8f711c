//! Top-level error types for today-alerts.

use std::sync::Arc;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Slack(#[from] SlackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required config key: {0}")]
    MissingKey(String),
}

/// Slack Web API call failures.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("failed to list channels for user {user_id}: {reason}")]
    ChannelListing { user_id: String, reason: String },

    #[error("failed to fetch history for channel {channel_id}: {reason}")]
    History { channel_id: String, reason: String },

    #[error("failed to look up user {user_id}: {reason}")]
    UserLookup { user_id: String, reason: String },

    #[error("failed to build slack view: {0}")]
    InvalidView(String),

    #[error("failed to present digest: {0}")]
    Presentation(String),
}
