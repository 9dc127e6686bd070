//! Configuration loading from TOML files, environment variables and CLI flags.
//!
//! Precedence for each value (highest wins):
//! 1. CLI flags (`--retry-duration`, `--group`)
//! 2. Environment variables (`RETRY_DURATION`, `RETRY_STAGE_LOG`)
//! 3. TOML file from `--config`, else `./retry-stage.toml`, else
//!    `$XDG_CONFIG_HOME/retry-stage/retry-stage.toml`
//! 4. Built-in defaults
//!
//! The retry window has no built-in default. If no layer supplies it,
//! loading fails and the process must not start.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

mod defaults;
mod duration;
mod env;
mod sources;
mod types;

use defaults::{DEFAULT_CONFIG_TEMPLATE, DEFAULT_DELAY_GROUP, DEFAULT_LOG_FILTER};
pub use duration::parse_retry_window;
use env::{read_env_overrides, EnvOverrides};
use sources::read_config_text_with_sources;
pub use sources::config_root_dir;
use types::FileConfig;
pub use types::{Config, LoadedConfig, LogConfig, RetryConfig};

/// Values supplied on the command line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliOverrides {
    pub retry_duration: Option<String>,
    pub group: Option<String>,
}

/// The bundled example configuration.
pub fn default_config_template() -> &'static str {
    DEFAULT_CONFIG_TEMPLATE
}

/// Load configuration from disk, environment and CLI overrides.
///
/// `path_override` is an explicit config file path (from `--config`).
pub fn load_config(
    path_override: Option<&str>,
    cli: &CliOverrides,
) -> Result<LoadedConfig, ConfigError> {
    load_config_from_sources(
        path_override,
        cli,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    cli: &CliOverrides,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<LoadedConfig, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) =
        read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let parsed: FileConfig = toml::from_str(&config_text)?;
    let env = read_env_overrides(&env_lookup);
    let mut notes = Vec::new();
    let config = resolve_config(parsed, &env, cli, &mut notes)?;
    Ok(LoadedConfig {
        config,
        source: source.to_string(),
        notes,
    })
}

fn resolve_config(
    parsed: FileConfig,
    env: &EnvOverrides,
    cli: &CliOverrides,
    notes: &mut Vec<String>,
) -> Result<Config, ConfigError> {
    let file_duration = parsed.retry.duration.map(|setting| setting.as_text());
    let (duration_text, origin) = if let Some(text) = cli.retry_duration.clone() {
        (text, "--retry-duration")
    } else if let Some(text) = env.retry_duration.clone() {
        (text, "RETRY_DURATION")
    } else if let Some(text) = file_duration.clone() {
        (text, "retry.duration")
    } else {
        return Err(ConfigError::Invalid(
            "retry.duration is required (set it in retry-stage.toml, RETRY_DURATION, or --retry-duration)"
                .to_string(),
        ));
    };
    if file_duration.is_some() && origin != "retry.duration" {
        notes.push(format!("{origin} overrides retry.duration from the config file"));
    }
    let duration = parse_retry_window(&duration_text)
        .map_err(|e| ConfigError::Invalid(format!("{origin}: {e}")))?;

    let group = cli
        .group
        .clone()
        .or(parsed.retry.group)
        .map(|g| g.trim().to_string())
        .unwrap_or_else(|| DEFAULT_DELAY_GROUP.to_string());
    if group.is_empty() {
        return Err(ConfigError::Invalid(
            "retry.group must not be empty".to_string(),
        ));
    }

    let filter = env
        .log_filter
        .clone()
        .or(parsed.log.filter)
        .or_else(|| env.rust_log.clone())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    Ok(Config {
        retry: RetryConfig { duration, group },
        log: LogConfig { filter },
    })
}
