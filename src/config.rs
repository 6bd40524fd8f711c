//! Configuration loading and validation.
//!
//! Values come from an optional TOML file and then from the environment,
//! which takes precedence. Only the Slack credentials are required.

use crate::error::{ConfigError, Result};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COMMAND: &str = "/today-alerts";
pub const DEFAULT_MAX_MESSAGES: usize = 80;
pub const DEFAULT_MAX_TEXT_CHARS: usize = 300;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_HISTORY_LIMIT: u16 = 100;

/// today-alerts configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub slack: SlackConfig,
    pub server: ServerConfig,
    pub digest: DigestConfig,
}

/// Slack app credentials.
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`) used for every Web API call.
    pub bot_token: String,
    /// Signing secret used to verify slash command requests.
    pub signing_secret: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"<redacted>")
            .field("signing_secret", &"<redacted>")
            .finish()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Slash command handled by this instance, including the leading `/`.
    pub command: String,
}

/// Digest behavior.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Hard cap on rendered message lines.
    pub max_messages: usize,
    /// Message text longer than this is cut and suffixed with `...`.
    pub max_text_chars: usize,
    /// In-flight history fetches / user lookups per invocation.
    pub concurrency: usize,
    /// Page size of the single history request made per channel.
    pub history_limit: u16,
    /// Extra case-insensitive mention string, e.g. a legacy `@handle`.
    pub secondary_mention: Option<String>,
    /// Zone that defines "today" and renders message times. `None` = process local.
    pub timezone: Option<chrono_tz::Tz>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            concurrency: DEFAULT_CONCURRENCY,
            history_limit: DEFAULT_HISTORY_LIMIT,
            secondary_mention: None,
            timezone: None,
        }
    }
}

/// On-disk TOML shape. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub slack: FileSlackConfig,
    pub server: FileServerConfig,
    pub digest: FileDigestConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSlackConfig {
    pub bot_token: Option<String>,
    pub signing_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileServerConfig {
    pub port: Option<u16>,
    pub command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileDigestConfig {
    pub max_messages: Option<usize>,
    pub concurrency: Option<usize>,
    pub history_limit: Option<u16>,
    pub secondary_mention: Option<String>,
    pub timezone: Option<String>,
}

impl Config {
    /// Default config file location, `<config_dir>/today-alerts/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("today-alerts").join("config.toml"))
    }

    /// Load configuration from an optional file and the process environment.
    ///
    /// An explicit `path` must exist. The default path is read only when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(FileConfig::read(path)?),
            None => match Self::default_config_path() {
                Some(default) if default.exists() => Some(FileConfig::read(&default)?),
                _ => None,
            },
        };

        Self::from_sources(file.unwrap_or_default(), |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with an environment lookup. Environment wins.
    pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let bot_token = env("SLACK_BOT_TOKEN")
            .or(file.slack.bot_token)
            .ok_or_else(|| ConfigError::MissingKey("SLACK_BOT_TOKEN".into()))?;
        let signing_secret = env("SLACK_SIGNING_SECRET")
            .or(file.slack.signing_secret)
            .ok_or_else(|| ConfigError::MissingKey("SLACK_SIGNING_SECRET".into()))?;

        let port = match env("PORT") {
            Some(value) => parse_value("PORT", &value)?,
            None => file.server.port.unwrap_or(DEFAULT_PORT),
        };
        let command = env("SLASH_COMMAND")
            .or(file.server.command)
            .unwrap_or_else(|| DEFAULT_COMMAND.into());
        if !command.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "slash command must start with '/', got {command:?}"
            ))
            .into());
        }

        let max_messages = match env("TODAY_ALERTS_MAX_MESSAGES") {
            Some(value) => parse_value("TODAY_ALERTS_MAX_MESSAGES", &value)?,
            None => file.digest.max_messages.unwrap_or(DEFAULT_MAX_MESSAGES),
        };
        if max_messages == 0 {
            return Err(ConfigError::Invalid("max_messages must be at least 1".into()).into());
        }

        let concurrency = match env("TODAY_ALERTS_CONCURRENCY") {
            Some(value) => parse_value("TODAY_ALERTS_CONCURRENCY", &value)?,
            None => file.digest.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
        };
        if concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()).into());
        }

        let history_limit = file.digest.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if !(1..=999).contains(&history_limit) {
            return Err(ConfigError::Invalid(format!(
                "history_limit must be between 1 and 999, got {history_limit}"
            ))
            .into());
        }

        let secondary_mention = env("TODAY_ALERTS_SECONDARY_MENTION")
            .or(file.digest.secondary_mention)
            .map(|mention| mention.trim().to_string())
            .filter(|mention| !mention.is_empty());

        let timezone = env("TODAY_ALERTS_TIMEZONE")
            .or(file.digest.timezone)
            .map(|name| {
                name.trim().parse::<chrono_tz::Tz>().map_err(|error| {
                    ConfigError::Invalid(format!("unknown timezone {name:?}: {error}"))
                })
            })
            .transpose()?;

        Ok(Self {
            slack: SlackConfig {
                bot_token,
                signing_secret,
            },
            server: ServerConfig { port, command },
            digest: DigestConfig {
                max_messages,
                max_text_chars: DEFAULT_MAX_TEXT_CHARS,
                concurrency,
                history_limit,
                secondary_mention,
                timezone,
            },
        })
    }
}

impl FileConfig {
    /// Read and parse a TOML config file.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Load {
            path: path.display().to_string(),
            source: Arc::new(error),
        })?;
        let file = toml::from_str(&content).map_err(|error| ConfigError::Parse {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        Ok(file)
    }
}

fn parse_value<T>(key: &str, value: &str) -> std::result::Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|error| ConfigError::Invalid(format!("{key}={value:?}: {error}")))
}
