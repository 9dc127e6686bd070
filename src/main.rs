//! CLI entry point for retry-stage.

mod cli;

use clap::Parser;
use retry_stage::build_info;
use retry_stage::clock::SystemClock;
use retry_stage::config::{default_config_template, load_config, CliOverrides};
use retry_stage::error::StageError;
use retry_stage::stage::RetryStage;
use retry_stage::transport::{run_binder, JsonLinesSink};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    if args.print_default_config {
        print!("{}", default_config_template());
        return;
    }

    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: cli::Args) -> Result<(), StageError> {
    let overrides = CliOverrides {
        retry_duration: args.retry_duration,
        group: args.group,
    };
    let loaded = load_config(args.config.as_deref(), &overrides)?;
    init_tracing(&loaded.config.log.filter);

    tracing::info!(
        version = %build_info::startup_metadata_line(),
        config = %loaded.source,
        retry_window_ms = loaded.config.retry.duration.as_millis() as u64,
        group = %loaded.config.retry.group,
        "retry stage starting"
    );
    for note in &loaded.notes {
        tracing::info!("{note}");
    }

    let (stage, channels) = RetryStage::new(&loaded.config.retry, SystemClock);
    let pending = stage.pending_count();
    let mut sink = JsonLinesSink::new(tokio::io::stdout());
    let reader = BufReader::new(tokio::io::stdin());

    tokio::select! {
        summary = run_binder(reader, &mut sink, stage, channels) => {
            let summary = summary?;
            tracing::info!(
                received = summary.received,
                retried = summary.retried,
                exhausted = summary.exhausted,
                rejected = summary.rejected,
                "retry stage stopped"
            );
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(dropped = pending.get(), "interrupted; dropping retries not yet released");
        }
    }
    Ok(())
}

/// Install the stderr subscriber. An unparsable filter falls back to `info`.
fn init_tracing(filter: &str) {
    let env_filter = match EnvFilter::try_new(filter) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("warning: invalid log filter `{filter}`: {e}; using `info`");
            EnvFilter::new("info")
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
