use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::analysis::normalize::normalize;
use crate::error::RiskError;
use crate::indicators::registry::Catalog;
use crate::models::{Contribution, GroundingSource, ObservedIndicator, RiskData};

/// Builds a [`RiskData`] stamped with the current time.
pub fn aggregate(
    catalog: &Catalog,
    indicators: Vec<ObservedIndicator>,
    sources: Vec<GroundingSource>,
) -> Result<RiskData, RiskError> {
    aggregate_at(catalog, indicators, sources, Utc::now())
}

/// Weighted total and ranked contributions over a complete indicator set.
///
/// The set must match `catalog` in count, order and spec, and every sub-score
/// must be the normalized value of its reading. Weights are used as given.
pub fn aggregate_at(
    catalog: &Catalog,
    indicators: Vec<ObservedIndicator>,
    sources: Vec<GroundingSource>,
    timestamp: DateTime<Utc>,
) -> Result<RiskData, RiskError> {
    validate_shape(catalog, &indicators)?;

    let weighted: f64 = indicators.iter().map(ObservedIndicator::impact).sum();
    let total_score = weighted.clamp(0.0, 100.0).round() as u8;

    let mut contributions: Vec<Contribution> = indicators
        .iter()
        .map(|ind| Contribution {
            id: ind.spec.id.clone(),
            name: ind.spec.name.clone(),
            impact: ind.impact(),
        })
        .collect();
    rank_contributions(&mut contributions);

    Ok(RiskData {
        total_score,
        last_updated: timestamp,
        indicators,
        contributions,
        sources,
    })
}

/// Descending by impact. Vec::sort_by is stable, so equal impacts keep
/// catalog order; -0.0 ties with 0.0.
fn rank_contributions(contributions: &mut [Contribution]) {
    contributions.sort_by(|a, b| b.impact.partial_cmp(&a.impact).unwrap_or(Ordering::Equal));
}

fn validate_shape(catalog: &Catalog, indicators: &[ObservedIndicator]) -> Result<(), RiskError> {
    if indicators.len() != catalog.len() {
        return Err(RiskError::IndicatorCount {
            expected: catalog.len(),
            actual: indicators.len(),
        });
    }

    for (position, (expected, observed)) in catalog.specs().iter().zip(indicators).enumerate() {
        if expected.id != observed.spec.id {
            return Err(RiskError::IndicatorMismatch {
                position,
                expected: expected.id.clone(),
                actual: observed.spec.id.clone(),
            });
        }
        if *expected != observed.spec {
            return Err(RiskError::SpecMismatch(expected.id.clone()));
        }
        if !observed.value.is_finite() {
            return Err(RiskError::NonFiniteValue {
                id: expected.id.clone(),
                value: observed.value,
            });
        }
        let sub_score = normalize(observed.value, &expected.calibration);
        if sub_score != observed.sub_score {
            return Err(RiskError::SubScoreMismatch {
                id: expected.id.clone(),
                expected: sub_score,
                actual: observed.sub_score,
            });
        }
    }

    Ok(())
}
