//! CLI argument parsing via clap.

use clap::Parser;
use retry_stage::build_info;

/// Retry stage for a message pipeline.
///
/// Reads envelopes as JSON lines on stdin and writes `retry`, `output` and
/// `error` frames as JSON lines on stdout. Logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "retry-stage", version = build_info::VERSION, long_version = build_info::LONG_VERSION)]
pub struct Args {
    /// Path to config file (default: ./retry-stage.toml or
    /// ~/.config/retry-stage/retry-stage.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Retry window, e.g. `86400`, `24h`, or `PT24H`. Overrides config and
    /// RETRY_DURATION.
    #[arg(short = 'd', long = "retry-duration", value_name = "DURATION")]
    pub retry_duration: Option<String>,

    /// Delay-scheduler group key.
    #[arg(long = "group")]
    pub group: Option<String>,

    /// Print the bundled example config and exit.
    #[arg(long = "print-default-config")]
    pub print_default_config: bool,
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn parses_overrides() {
        let args = Args::parse_from(["retry-stage", "-d", "24h", "--group", "g", "-c", "x.toml"]);
        assert_eq!(args.retry_duration.as_deref(), Some("24h"));
        assert_eq!(args.group.as_deref(), Some("g"));
        assert_eq!(args.config.as_deref(), Some("x.toml"));
        assert!(!args.print_default_config);
    }

    #[test]
    fn defaults_are_empty() {
        let args = Args::parse_from(["retry-stage"]);
        assert!(args.retry_duration.is_none());
        assert!(args.config.is_none());
        assert!(args.group.is_none());
    }

    #[test]
    fn print_default_config_flag() {
        let args = Args::parse_from(["retry-stage", "--print-default-config"]);
        assert!(args.print_default_config);
    }
}
