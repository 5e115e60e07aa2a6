use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid instrument: {0}")]
    InvalidInstrument(String),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Unexpected command: {0}")]
    UnexpectedCommand(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure modes of a single outbound message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("request timed out")]
    Timeout,

    #[error("bot token rejected")]
    Unauthorized,

    #[error("destination chat not found")]
    ChatNotFound,

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("API response error: {status} - {description}")]
    Api { status: u16, description: String },

    #[error("network error: {0}")]
    Network(String),
}

impl DeliveryError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeliveryError::Timeout | DeliveryError::RateLimited { .. } | DeliveryError::Network(_)
        )
    }
}

// Request URLs carry the bot token, so they never make it into the message.
impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeliveryError::Timeout
        } else {
            DeliveryError::Network(err.without_url().to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
