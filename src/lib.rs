pub mod analysis;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod fetcher;
pub mod indicators;
pub mod models;
pub mod report;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};
use crate::config::Settings;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// verbosity flags.
pub fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_lowercase()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

pub async fn run(args: Args) -> Result<()> {
    let settings = Settings::from_env()?;
    tracing::debug!("Settings: history={} staleness={}d timeout={}s", settings.history_points, settings.max_staleness_days, settings.request_timeout_secs);

    match args.command {
        Command::Score { format, output, offline } => commands::score::run(&settings, format, output, offline).await,
        Command::Watch { cron } => commands::watch::run(&settings, cron).await,
        Command::Catalog => commands::catalog::run(),
    }
}
