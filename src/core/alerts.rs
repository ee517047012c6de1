use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::analysis::RiskLevel;
use crate::core::orchestrator::Refresh;

// Alert Types
// 1. Risk level change between refreshes
// 2. Refresh scored entirely from fallback values

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// Remembers the last observed level across watch-mode refreshes.
#[derive(Debug, Default)]
pub struct LevelTracker {
    last_level: Option<RiskLevel>,
}

impl LevelTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_level(&self) -> Option<RiskLevel> {
        self.last_level
    }

    /// Records the refresh and returns any alerts it raises. Each alert is
    /// also logged.
    pub fn check(&mut self, refresh: &Refresh) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let data = &refresh.data;
        let level = data.level();

        // First run only records
        if let Some(previous) = self.last_level.replace(level) {
            if previous != level {
                let driver = data
                    .primary_driver()
                    .map(|c| format!(" Largest contributor: {}.", c.name))
                    .unwrap_or_default();
                alerts.push(Alert {
                    title: "Market risk level changed".to_string(),
                    body: format!(
                        "Risk moved from {} to {} (score {}).{}",
                        previous, level, data.total_score, driver
                    ),
                    timestamp: data.last_updated,
                });
            }
        }

        if refresh.feed.all_fallback {
            alerts.push(Alert {
                title: "No live market data".to_string(),
                body: format!(
                    "Every indicator fell back to its default value; score {} is not based on current data.",
                    data.total_score
                ),
                timestamp: data.last_updated,
            });
        }

        for alert in &alerts {
            warn!("ALERT: {} - {}", alert.title, alert.body);
        }
        alerts
    }
}
