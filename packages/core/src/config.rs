//! Engine configuration
//!
//! The tree and forest types never read the environment. Only
//! [`EngineConfig::from_env`] does, for the process that hosts them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const RULES_FILE_ENV: &str = "RULES_FILE";
pub const TREE_NAME_ENV: &str = "RULE_TREE_NAME";
pub const REFRESH_INTERVAL_ENV: &str = "REFRESH_INTERVAL";
pub const SHUTDOWN_TIMEOUT_ENV: &str = "SHUTDOWN_TIMEOUT";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration for {key}: '{value}'")]
    InvalidDuration { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for hosting a rule forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rule definitions file
    pub rules_file: PathBuf,

    /// Name of the tree built from `rules_file`
    pub tree_name: String,

    /// Base document the tree's root starts from
    pub template: String,

    #[serde(with = "duration_text")]
    pub refresh_interval: Duration,

    /// How long to wait for the refresh loop to stop
    #[serde(with = "duration_text")]
    pub shutdown_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules_file: PathBuf::from("conf/rules.json"),
            tree_name: "default".to_string(),
            template: "{}".to_string(),
            refresh_interval: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(3),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup(RULES_FILE_ENV) {
            config.rules_file = PathBuf::from(path);
        }
        if let Some(name) = lookup(TREE_NAME_ENV) {
            config.tree_name = name;
        }
        if let Some(value) = lookup(REFRESH_INTERVAL_ENV) {
            config.refresh_interval = parse_env_duration(REFRESH_INTERVAL_ENV, &value)?;
        }
        if let Some(value) = lookup(SHUTDOWN_TIMEOUT_ENV) {
            config.shutdown_timeout = parse_env_duration(SHUTDOWN_TIMEOUT_ENV, &value)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("rules_file cannot be empty".to_string()));
        }
        if self.tree_name.trim().is_empty() {
            return Err(ConfigError::Invalid("tree_name cannot be empty".to_string()));
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "refresh_interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse `"250ms"`, `"5s"`, `"2m"` or a bare number of seconds
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(at) => value.split_at(at),
        None => (value, "s"),
    };
    let amount: u64 = digits.parse().ok()?;
    match unit.trim() {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => amount.checked_mul(60).map(Duration::from_secs),
        _ => None,
    }
}

/// Formats durations the way [`parse_duration`] reads them
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 60_000 == 0 && millis > 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

mod duration_text {
    use super::{format_duration, parse_duration};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_duration(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid duration '{}'", text)))
    }
}
