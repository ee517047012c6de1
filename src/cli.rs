//! Command-line interface argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

/// Market Risk Index - a 0-100 composite of six market stress indicators
///
/// Examples:
///   market-risk score
///   market-risk score --format json --output snapshot.json
///   market-risk watch --cron "0 */30 * * * *"
///   market-risk catalog
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch every indicator once and print the score
    Score {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Also write the JSON snapshot to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Skip every network source and score the fallback values
        #[arg(long)]
        offline: bool,
    },

    /// Refresh on a cron schedule and log alerts until Ctrl-C
    Watch {
        /// Six-field cron expression (sec min hour day month weekday)
        #[arg(long, env = "RISK_WATCH_CRON", value_name = "EXPR")]
        cron: Option<String>,
    },

    /// Print the indicator catalog
    Catalog,
}

/// Output format for the score report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report (default)
    #[default]
    Text,
    /// JSON snapshot
    Json,
}

impl Args {
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::WARN
        } else {
            Level::INFO
        }
    }
}
