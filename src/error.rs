use teloxide::{ApiError, RequestError};
use thiserror::Error;

/// A failure reported by the transport while polling for updates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollingError {
    /// Telegram rejected the bot token ("Unauthorized" or "Not Found").
    #[error("bot token rejected by Telegram: {0}")]
    Unauthorized(String),

    /// The request never got a usable response (DNS, TLS, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// Any other error returned by the Bot API.
    #[error("telegram API error: {0}")]
    Api(String),
}

impl PollingError {
    /// Fatal errors are credential problems; retrying cannot fix them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PollingError::Unauthorized(_))
    }
}

impl From<RequestError> for PollingError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Api(ApiError::InvalidToken) => {
                PollingError::Unauthorized(ApiError::InvalidToken.to_string())
            }
            RequestError::Network(e) => PollingError::Network(e.to_string()),
            other => PollingError::Api(other.to_string()),
        }
    }
}

/// Conditions that end the supervisor. The process exits non-zero on any of these.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("invalid bot token, check BOT_TOKEN: {0}")]
    InvalidToken(PollingError),

    #[error("gave up reconnecting after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: PollingError },

    #[error("transport event stream closed")]
    EventStreamClosed,
}
