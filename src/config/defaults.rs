//! Default configuration constants.

/// Embedded `retry-stage.toml` template printed by `--print-default-config`.
pub(super) const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../templates/retry-stage.toml");
/// Config file name looked up locally and under the per-user config dir.
pub(super) const CONFIG_FILE_NAME: &str = "retry-stage.toml";
/// Per-user config directory name under `$XDG_CONFIG_HOME`.
pub(super) const CONFIG_DIR_NAME: &str = "retry-stage";
/// Delay group key when none is configured.
pub(super) const DEFAULT_DELAY_GROUP: &str = "retry-stage.delay";
/// Log filter when neither config nor environment sets one.
pub(super) const DEFAULT_LOG_FILTER: &str = "info";

/// Retry window override, named after the `retry.duration` key.
pub(super) const ENV_RETRY_DURATION: &str = "RETRY_DURATION";
/// Log filter override.
pub(super) const ENV_LOG_FILTER: &str = "RETRY_STAGE_LOG";
/// Generic `tracing` filter, used only when nothing more specific is set.
pub(super) const ENV_RUST_LOG: &str = "RUST_LOG";
