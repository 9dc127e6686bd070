//! Configuration data model.
//!
//! `File*` structs mirror the TOML layout with every field optional; the
//! resolved [`Config`] is what the rest of the crate consumes.

use serde::Deserialize;
use std::time::Duration;

/// Top-level resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub retry: RetryConfig,
    pub log: LogConfig,
}

/// Settings for the retry engine itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Window after the first failure during which retries are allowed.
    /// Read once at startup.
    pub duration: Duration,
    /// Delay-scheduler group key.
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

/// Configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// Human-readable description of the config file used, if any.
    pub source: String,
    /// Non-fatal notes worth logging once the subscriber is up.
    pub notes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct FileConfig {
    pub(super) retry: FileRetryConfig,
    pub(super) log: FileLogConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct FileRetryConfig {
    pub(super) duration: Option<DurationSetting>,
    pub(super) group: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct FileLogConfig {
    pub(super) filter: Option<String>,
}

/// `retry.duration` may be written as integer seconds or as a string.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(super) enum DurationSetting {
    Seconds(u64),
    Text(String),
}

impl DurationSetting {
    pub(super) fn as_text(&self) -> String {
        match self {
            Self::Seconds(secs) => secs.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}
