use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::core::orchestrator::{Collector, Refresh};
use crate::core::scheduler::{self, RefreshHook};
use crate::analysis::MarketStatus;

pub async fn run(settings: &Settings, cron: Option<String>) -> Result<()> {
    let cron = cron.unwrap_or_else(|| settings.watch_cron.clone());
    let collector = Arc::new(Collector::from_settings(settings, false)?);

    let hook: RefreshHook = Arc::new(|refresh: &Refresh| {
        let status = MarketStatus::from_risk_data(&refresh.data);
        println!(
            "[{}] {}/100 {} | driver: {}",
            refresh.data.last_updated.format("%Y-%m-%d %H:%M:%S"),
            status.risk_score,
            status.status_label,
            status.key_driver
        );
    });

    let mut sched = scheduler::init(collector, &cron, hook)
        .await
        .with_context(|| format!("Failed to start watch schedule '{}'", cron))?;

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Stopping watch...");
    sched.shutdown().await?;
    Ok(())
}
