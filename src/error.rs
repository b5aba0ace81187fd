use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Slack API error: {0}")]
    RemoteCallFailed(String),

    #[error("Message not found: channel={channel} ts={ts}")]
    MessageNotFound { channel: String, ts: String },

    #[error("Channel lookup failed for {channel}: {reason}")]
    ChannelLookupFailed { channel: String, reason: String },

    #[error("User group lookup failed for {group}: {reason}")]
    GroupLookupFailed { group: String, reason: String },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReminderError>;
