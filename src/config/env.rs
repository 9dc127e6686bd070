//! Environment overrides.

use super::defaults::{ENV_LOG_FILTER, ENV_RETRY_DURATION, ENV_RUST_LOG};

/// Values the environment may override, read through an injectable lookup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(super) struct EnvOverrides {
    pub(super) retry_duration: Option<String>,
    pub(super) log_filter: Option<String>,
    pub(super) rust_log: Option<String>,
}

pub(super) fn read_env_overrides<FEnv>(env_lookup: &FEnv) -> EnvOverrides
where
    FEnv: Fn(&str) -> Option<String>,
{
    EnvOverrides {
        retry_duration: non_empty(env_lookup(ENV_RETRY_DURATION)),
        log_filter: non_empty(env_lookup(ENV_LOG_FILTER)),
        rust_log: non_empty(env_lookup(ENV_RUST_LOG)),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_ignored() {
        let overrides = read_env_overrides(&|name: &str| match name {
            ENV_RETRY_DURATION => Some("   ".to_string()),
            ENV_LOG_FILTER => Some(" debug ".to_string()),
            _ => None,
        });
        assert_eq!(overrides.retry_duration, None);
        assert_eq!(overrides.log_filter.as_deref(), Some("debug"));
        assert_eq!(overrides.rust_log, None);
    }
}
