use anyhow::Result;
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::core::orchestrator::Collector;
use crate::report;

pub async fn run(settings: &Settings, format: OutputFormat, output: Option<PathBuf>, offline: bool) -> Result<()> {
    let collector = Collector::from_settings(settings, offline)?;
    let refresh = collector.refresh().await?;

    match format {
        OutputFormat::Text => {
            let color = std::io::stdout().is_terminal();
            print!("{}", report::render_text(&refresh, color));
        }
        OutputFormat::Json => println!("{}", report::to_json(&refresh)?),
    }

    if let Some(path) = output {
        report::write_snapshot(&refresh, &path)?;
    }

    if refresh.feed.all_fallback {
        eprintln!("⚠️  No live data: the score above is built entirely from fallback values.");
    }
    Ok(())
}
