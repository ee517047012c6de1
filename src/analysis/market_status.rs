use serde::Serialize;
use std::fmt;

use crate::models::RiskData;

/// Five equal-width bands over the 0-100 total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Moderate,
    Elevated,
    Extreme,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => RiskLevel::Extreme,
            60..=79 => RiskLevel::Elevated,
            40..=59 => RiskLevel::Moderate,
            20..=39 => RiskLevel::Low,
            _ => RiskLevel::VeryLow,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "Very Low",
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Elevated => "Elevated",
            RiskLevel::Extreme => "Extreme Risk",
        }
    }

    /// ANSI colour used by the text report.
    pub fn ansi_color(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "\x1b[32m",
            RiskLevel::Low => "\x1b[92m",
            RiskLevel::Moderate => "\x1b[33m",
            RiskLevel::Elevated => "\x1b[38;5;208m",
            RiskLevel::Extreme => "\x1b[31m",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStatus {
    pub risk_score: u8,
    pub level: RiskLevel,
    pub status_label: String,
    pub key_driver: String,
    pub summary: String,
}

impl MarketStatus {
    pub fn from_risk_data(data: &RiskData) -> Self {
        let level = data.level();
        let key_driver = data
            .primary_driver()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let summary = format!(
            "Market Risk Score is {} ({}). Primary risk driver is {}.",
            data.total_score, level, key_driver
        );

        MarketStatus {
            risk_score: data.total_score,
            level,
            status_label: level.label().to_string(),
            key_driver,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::from_score(19), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::from_score(20), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(59), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::Elevated);
        assert_eq!(RiskLevel::from_score(80), RiskLevel::Extreme);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Extreme);
    }

    #[test]
    fn test_labels() {
        assert_eq!(RiskLevel::Extreme.to_string(), "Extreme Risk");
        assert_eq!(RiskLevel::VeryLow.label(), "Very Low");
    }
}
