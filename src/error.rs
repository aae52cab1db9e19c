//! Error types for rssbot.

use thiserror::Error;

/// Common error type for rssbot.
#[derive(Error, Debug)]
pub enum BotError {
    /// The feed could not be fetched or parsed.
    #[error("feed error: {0}")]
    Fetch(String),

    /// The key-value backend failed to read, write or delete.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Requested key does not exist in the channel namespace.
    #[error("{0} not found")]
    NotFound(String),

    /// The channel has no feed subscription.
    #[error("no subscription for channel {0}")]
    NoSubscription(String),

    /// Inbound command had an unknown verb or missing parameters.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// The chat transport refused a message.
    #[error("notification failed: {0}")]
    Notify(String),

    /// A persisted record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BotError {
    /// Whether this error describes an expected absence rather than a fault.
    pub fn is_absence(&self) -> bool {
        matches!(self, BotError::NotFound(_) | BotError::NoSubscription(_))
    }
}

impl From<sqlx::Error> for BotError {
    fn from(e: sqlx::Error) -> Self {
        BotError::StoreUnavailable(e.to_string())
    }
}

/// Result type alias for rssbot operations.
pub type Result<T> = std::result::Result<T, BotError>;
