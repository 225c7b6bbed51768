use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::supervisor::RetryPolicy;

/// Environment variable holding the bot token
pub const BOT_TOKEN_VAR: &str = "BOT_TOKEN";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

/// Retry and timeout tuning, read from the optional `[polling]` table
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PollingConfig {
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Timeout for a single HTTP request to the Bot API
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long Telegram may hold a `getUpdates` call open.
    /// Must stay below the request timeout.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u32,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    polling: Option<PollingConfig>,
}

fn default_initial_retry_delay_ms() -> u64 {
    1000
}

fn default_max_retry_delay_ms() -> u64 {
    60_000
}

fn default_max_retries() -> u32 {
    5
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_poll_timeout_secs() -> u32 {
    10
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            max_retries: default_max_retries(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl PollingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.initial_retry_delay_ms),
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
            max_retries: self.max_retries,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.initial_retry_delay_ms == 0 {
            bail!("polling.initial_retry_delay_ms must be greater than zero");
        }
        if self.max_retry_delay_ms < self.initial_retry_delay_ms {
            bail!("polling.max_retry_delay_ms must not be below polling.initial_retry_delay_ms");
        }
        if u64::from(self.poll_timeout_secs) * 1000 >= self.request_timeout_ms {
            bail!("polling.poll_timeout_secs must be shorter than polling.request_timeout_ms");
        }
        Ok(())
    }
}

impl Config {
    /// Load the bot token from the environment and the optional TOML file at
    /// `path` for polling overrides. `.env` is loaded by the caller beforehand.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            ),
            None => None,
        };

        Self::from_parts(std::env::var(BOT_TOKEN_VAR).ok(), content.as_deref())
    }

    fn from_parts(bot_token: Option<String>, content: Option<&str>) -> Result<Self> {
        let bot_token = match bot_token {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => bail!("{} is not defined in the environment or .env file", BOT_TOKEN_VAR),
        };

        let file: FileConfig = match content {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => FileConfig::default(),
        };
        let polling = file.polling.unwrap_or_default();
        polling.validate()?;

        Ok(Config {
            telegram: TelegramConfig { bot_token },
            polling,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_is_an_error() {
        let err = Config::from_parts(None, None).unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
        assert!(Config::from_parts(Some("   ".into()), None).is_err());
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::from_parts(Some("123:abc".into()), None).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.polling, PollingConfig::default());

        let policy = config.polling.retry_policy();
        assert_eq!(policy.initial_delay, Duration::from_millis(1000));
        assert_eq!(policy.max_delay, Duration::from_millis(60_000));
        assert_eq!(policy.max_retries, 5);
        assert_eq!(config.polling.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_polling_section() {
        let toml = r#"
[polling]
max_retries = 8
initial_retry_delay_ms = 500
"#;
        let config = Config::from_parts(Some("t".into()), Some(toml)).unwrap();
        assert_eq!(config.polling.max_retries, 8);
        assert_eq!(config.polling.initial_retry_delay_ms, 500);
        assert_eq!(config.polling.max_retry_delay_ms, 60_000);
        assert_eq!(config.polling.poll_timeout_secs, 10);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_parts(Some("t".into()), Some("")).unwrap();
        assert_eq!(config.polling, PollingConfig::default());
    }

    #[test]
    fn test_rejects_ceiling_below_initial_delay() {
        let toml = "[polling]\ninitial_retry_delay_ms = 5000\nmax_retry_delay_ms = 1000\n";
        assert!(Config::from_parts(Some("t".into()), Some(toml)).is_err());
    }

    #[test]
    fn test_rejects_poll_timeout_above_request_timeout() {
        let toml = "[polling]\nrequest_timeout_ms = 5000\npoll_timeout_secs = 10\n";
        assert!(Config::from_parts(Some("t".into()), Some(toml)).is_err());
    }
}
