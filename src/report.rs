//! Rendering of a refresh for the terminal and as a JSON snapshot.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::analysis::{Direction, MarketStatus};
use crate::core::orchestrator::{FeedSummary, Refresh};
use crate::indicators::registry::Registry;
use crate::models::RiskData;

const GAUGE_WIDTH: usize = 40;
const RESET: &str = "\x1b[0m";

/// JSON document written by `score --format json` and `--output`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<'a> {
    pub status: MarketStatus,
    #[serde(flatten)]
    pub data: &'a RiskData,
    pub feed: &'a FeedSummary,
}

impl<'a> Snapshot<'a> {
    pub fn new(refresh: &'a Refresh) -> Self {
        Self {
            status: MarketStatus::from_risk_data(&refresh.data),
            data: &refresh.data,
            feed: &refresh.feed,
        }
    }
}

pub fn to_json(refresh: &Refresh) -> Result<String> {
    serde_json::to_string_pretty(&Snapshot::new(refresh)).context("Failed to serialize risk snapshot")
}

pub fn write_snapshot(refresh: &Refresh, path: &Path) -> Result<()> {
    let json = to_json(refresh)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    tracing::info!("Snapshot written to {}", path.display());
    Ok(())
}

fn gauge(score: u8) -> String {
    let filled = usize::from(score.min(100)) * GAUGE_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(GAUGE_WIDTH - filled))
}

pub fn render_text(refresh: &Refresh, color: bool) -> String {
    let data = &refresh.data;
    let status = MarketStatus::from_risk_data(data);
    let (on, off) = if color { (status.level.ansi_color(), RESET) } else { ("", "") };

    let mut out = String::new();
    let _ = writeln!(out, "MARKET RISK INDEX  {}", data.last_updated.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}{:>3}/100  {}{}  {}", on, data.total_score, status.status_label, off, gauge(data.total_score));
    let _ = writeln!(out, "  {}", status.summary);

    if refresh.feed.all_fallback {
        let _ = writeln!(out);
        let _ = writeln!(out, "  WARNING: no live data was available. Every value below is a fallback default.");
    } else if !refresh.feed.fallback_ids.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Note: fallback values used for {}", refresh.feed.fallback_ids.join(", "));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Contributions");
    for c in &data.contributions {
        let _ = writeln!(out, "  {:<34} {:>6.2}", c.name, c.impact);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Indicators");
    let _ = writeln!(
        out,
        "  {:<34} {:>9} {:>6} {:>6}  {}",
        "Name", "Value", "Score", "Weight", "Source"
    );
    for ind in &data.indicators {
        let value = format!("{:.2}{}", ind.value, ind.spec.unit);
        let _ = writeln!(
            out,
            "  {:<34} {:>9} {:>6} {:>5.0}%  {}",
            ind.spec.name,
            value,
            ind.sub_score,
            ind.spec.weight * 100.0,
            ind.provenance.label()
        );
    }

    if !data.sources.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Sources");
        for s in &data.sources {
            let _ = writeln!(out, "  - {} <{}>", s.title, s.uri);
        }
    }

    out
}

/// Static table of every indicator's calibration and sources.
pub fn render_catalog() -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<34} {:>7} {:>7} {:<7} {:>6} {:>8}  {}",
        "ID", "Name", "Min", "Max", "Risky", "Weight", "Fallback", "Sources"
    );

    for def in Registry::get_all_indicators() {
        let risky = match def.direction {
            Direction::HigherIsRisky => "high",
            Direction::LowerIsRisky => "low",
        };
        let sources = def
            .sources()
            .iter()
            .map(|s| format!("{} {}", s.source.label(), s.symbol))
            .collect::<Vec<_>>()
            .join(" > ");
        let _ = writeln!(
            out,
            "{:<12} {:<34} {:>7.2} {:>7.2} {:<7} {:>5.0}% {:>8.2}  {} > search {} > fallback",
            def.id,
            def.name,
            def.min,
            def.max,
            risky,
            def.weight * 100.0,
            def.fallback,
            sources,
            def.search_label
        );
    }
    out
}
