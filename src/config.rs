use crate::chat::message::has_title_placeholder;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Configuration keys enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    GitlabUrl,
    Token,
    Group,
    RocketUrl,
    User,
    Pass,
    Channel,
    Msg,
    Workers,
    OnError,
    TimeoutSecs,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::GitlabUrl => "gitlab_url",
            ConfigKey::Token => "token",
            ConfigKey::Group => "group",
            ConfigKey::RocketUrl => "rocket_url",
            ConfigKey::User => "user",
            ConfigKey::Pass => "pass",
            ConfigKey::Channel => "channel",
            ConfigKey::Msg => "msg",
            ConfigKey::Workers => "workers",
            ConfigKey::OnError => "on_error",
            ConfigKey::TimeoutSecs => "timeout_secs",
        }
    }

    /// Get all config keys
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::GitlabUrl,
            ConfigKey::Token,
            ConfigKey::Group,
            ConfigKey::RocketUrl,
            ConfigKey::User,
            ConfigKey::Pass,
            ConfigKey::Channel,
            ConfigKey::Msg,
            ConfigKey::Workers,
            ConfigKey::OnError,
            ConfigKey::TimeoutSecs,
        ]
    }
}

/// Placeholder in the chat message template replaced by the milestone title.
pub const TITLE_PLACEHOLDER: &str = "%s";
pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// What to do when a single milestone fails with a tracker error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Stop the whole run and report the error
    #[default]
    Abort,
    /// Log the error and continue with the next milestone
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub base_url: String,
    pub token: String,
    pub group_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub base_url: String,
    pub user: String,
    pub password: String,
    pub channel: String,
    pub message_template: String,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub chat: ChatConfig,
    pub workers: usize,
    pub failure_policy: FailurePolicy,
    pub timeout: Duration,
}

/// Parses a JSON configuration file content into a map of configuration values.
///
/// - Returns an empty map if `content` is empty or only whitespace.
/// - Unknown keys are skipped.
/// - Returns an `Err` if the content is not valid JSON or not a JSON object.
pub fn parse_config(content: &[u8]) -> Result<HashMap<ConfigKey, Value>> {
    if content.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(HashMap::new());
    }

    let value: Value = serde_json::from_slice(content).context("Failed to parse config JSON")?;

    if let Value::Object(map) = &value {
        let config_map = ConfigKey::all()
            .iter()
            .filter_map(|key| map.get(key.as_str()).map(|val| (*key, val.clone())))
            .collect();
        return Ok(config_map);
    }

    Err(anyhow::anyhow!("Config must be a JSON object"))
}

/// Reads and parses the config file at `path`.
pub fn load_config_file(path: &Path) -> Result<HashMap<ConfigKey, Value>> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Merges `updates` into `base_config` and returns a new configuration map.
///
/// If a key exists in both, the value from `updates` wins.
pub fn update_config(
    base_config: &HashMap<ConfigKey, Value>,
    updates: &HashMap<ConfigKey, Value>,
) -> HashMap<ConfigKey, Value> {
    let mut new_config = base_config.clone();
    for (key, value) in updates {
        new_config.insert(*key, value.clone());
    }
    new_config
}

fn string_value(
    values: &HashMap<ConfigKey, Value>,
    key: ConfigKey,
) -> Result<Option<String>, ConfigError> {
    match values.get(&key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(ConfigError::Invalid {
            key: key.as_str(),
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn required_string(
    values: &HashMap<ConfigKey, Value>,
    key: ConfigKey,
) -> Result<String, ConfigError> {
    string_value(values, key)?
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::Missing(key.as_str()))
}

fn number_value(
    values: &HashMap<ConfigKey, Value>,
    key: ConfigKey,
) -> Result<Option<u64>, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: key.as_str(),
        reason,
    };
    match values.get(&key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(format!("expected a non-negative integer, got {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(format!("expected a non-negative integer, got {s:?}"))),
        Some(other) => Err(invalid(format!("expected a number, got {other}"))),
    }
}

fn base_url(values: &HashMap<ConfigKey, Value>, key: ConfigKey) -> Result<String, ConfigError> {
    Ok(required_string(values, key)?.trim_end_matches('/').to_string())
}

impl Config {
    /// Builds a validated `Config` from merged configuration values.
    pub fn from_values(values: &HashMap<ConfigKey, Value>) -> Result<Config, ConfigError> {
        let group_id = number_value(values, ConfigKey::Group)?
            .ok_or(ConfigError::Missing(ConfigKey::Group.as_str()))?;

        let message_template = required_string(values, ConfigKey::Msg)?;
        if !has_title_placeholder(&message_template) {
            return Err(ConfigError::Invalid {
                key: ConfigKey::Msg.as_str(),
                reason: format!("template must contain the {TITLE_PLACEHOLDER} placeholder"),
            });
        }

        let workers = match number_value(values, ConfigKey::Workers)? {
            None => DEFAULT_WORKERS,
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: ConfigKey::Workers.as_str(),
                    reason: "must be at least 1".to_string(),
                });
            }
            Some(n) => n as usize,
        };

        let failure_policy = match string_value(values, ConfigKey::OnError)? {
            None => FailurePolicy::default(),
            Some(s) => <FailurePolicy as clap::ValueEnum>::from_str(&s, true).map_err(
                |reason| ConfigError::Invalid {
                    key: ConfigKey::OnError.as_str(),
                    reason,
                },
            )?,
        };

        let timeout_secs = match number_value(values, ConfigKey::TimeoutSecs)? {
            None => DEFAULT_TIMEOUT_SECS,
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: ConfigKey::TimeoutSecs.as_str(),
                    reason: "must be at least 1".to_string(),
                });
            }
            Some(n) => n,
        };

        Ok(Config {
            tracker: TrackerConfig {
                base_url: base_url(values, ConfigKey::GitlabUrl)?,
                token: required_string(values, ConfigKey::Token)?,
                group_id,
            },
            chat: ChatConfig {
                base_url: base_url(values, ConfigKey::RocketUrl)?,
                user: string_value(values, ConfigKey::User)?.unwrap_or_default(),
                password: string_value(values, ConfigKey::Pass)?.unwrap_or_default(),
                channel: required_string(values, ConfigKey::Channel)?,
                message_template,
            },
            workers,
            failure_policy,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
