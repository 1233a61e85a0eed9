//! Configuration data types.

use crate::reason::Signal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// How stop reasons are collected and bounded
    #[serde(default)]
    pub shutdown: ShutdownConfig,

    /// Commands run when shutdown starts
    #[serde(default)]
    pub hooks: Vec<HookConfig>,
}

/// Global configuration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Stop signal and watchdog settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShutdownConfig {
    /// Signals that trigger shutdown
    #[serde(default = "default_signals")]
    pub signals: Vec<Signal>,

    /// Exit immediately when a second signal arrives
    #[serde(default)]
    pub force_on_second_signal: bool,

    /// Force exit if shutdown takes longer than this
    #[serde(default, with = "option_humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            signals: default_signals(),
            force_on_second_signal: false,
            timeout: None,
        }
    }
}

/// A command run as a shutdown callback.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HookConfig {
    /// Unique name used in logs and errors
    pub name: String,

    /// Program followed by its arguments
    pub command: Vec<String>,

    /// Higher priorities run first
    #[serde(default)]
    pub priority: i32,

    /// Kill the command if it runs longer than this
    #[serde(default, with = "option_humantime_serde")]
    pub timeout: Option<Duration>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_signals() -> Vec<Signal> {
    Signal::DEFAULT.to_vec()
}

/// Custom serde module for optional humantime durations.
mod option_humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => {
                let s = humantime::format_duration(*d).to_string();
                serializer.serialize_some(&s)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            Some(s) => {
                let d = humantime::parse_duration(&s).map_err(serde::de::Error::custom)?;
                Ok(Some(d))
            }
            None => Ok(None),
        }
    }
}
