use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::market_status::RiskLevel;
use crate::error::RiskError;
use crate::indicators::registry::IndicatorSpec;

/// A single observation as returned by a fetcher.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Display-only trend point attached to an observed indicator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl From<&DataPoint> for HistoryPoint {
    fn from(point: &DataPoint) -> Self {
        Self {
            date: point.timestamp.date_naive(),
            value: point.value,
        }
    }
}

/// Citation for where a value came from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

impl GroundingSource {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self { title: title.into(), uri: uri.into() }
    }
}

/// Which tier of the degradation chain produced a value.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "tier", rename_all = "lowercase")]
pub enum Provenance {
    Live { source: String },
    Secondary { source: String },
    Search,
    Fallback,
}

impl Provenance {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Provenance::Fallback)
    }

    pub fn label(&self) -> String {
        match self {
            Provenance::Live { source } => source.clone(),
            Provenance::Secondary { source } => format!("{} (secondary)", source),
            Provenance::Search => "grounded search".to_string(),
            Provenance::Fallback => "fallback".to_string(),
        }
    }
}

/// Raw per-indicator input resolved by the collector, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub id: String,
    pub value: f64,
    pub history: Vec<HistoryPoint>,
    pub provenance: Provenance,
    pub citations: Vec<GroundingSource>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservedIndicator {
    #[serde(flatten)]
    pub spec: IndicatorSpec,
    pub value: f64,
    pub sub_score: u8,
    pub history: Vec<HistoryPoint>,
    pub provenance: Provenance,
}

impl ObservedIndicator {
    /// Scores `value` against the indicator's own calibration.
    pub fn observe(
        spec: IndicatorSpec,
        value: f64,
        history: Vec<HistoryPoint>,
        provenance: Provenance,
    ) -> Result<Self, RiskError> {
        let sub_score = spec.calibration.sub_score(&spec.id, value)?;
        Ok(Self { spec, value, sub_score, history, provenance })
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn impact(&self) -> f64 {
        f64::from(self.sub_score) * self.spec.weight
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Contribution {
    pub id: String,
    pub name: String,
    pub impact: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskData {
    pub total_score: u8,
    pub last_updated: DateTime<Utc>,
    pub indicators: Vec<ObservedIndicator>,
    pub contributions: Vec<Contribution>,
    pub sources: Vec<GroundingSource>,
}

impl RiskData {
    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.total_score)
    }

    /// The largest contributor to the total score.
    pub fn primary_driver(&self) -> Option<&Contribution> {
        self.contributions.first()
    }

    pub fn indicator(&self, id: &str) -> Option<&ObservedIndicator> {
        self.indicators.iter().find(|i| i.id() == id)
    }
}
