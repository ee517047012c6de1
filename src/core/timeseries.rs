use crate::models::{DataPoint, HistoryPoint};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Aligns two time series by matching timestamps.
///
/// Series A is the master frequency. For each A timestamp the latest B value
/// at or before it is used (forward fill); A points before B's first
/// observation are dropped.
///
/// Returns a vector of tuples (timestamp, value_a, value_b).
pub fn align_series(series_a: &[DataPoint], series_b: &[DataPoint]) -> Vec<(DateTime<Utc>, f64, f64)> {
    let map_a: BTreeMap<DateTime<Utc>, f64> = series_a.iter().map(|dp| (dp.timestamp, dp.value)).collect();
    let map_b: BTreeMap<DateTime<Utc>, f64> = series_b.iter().map(|dp| (dp.timestamp, dp.value)).collect();

    let mut result = Vec::with_capacity(map_a.len());
    let mut last_b_val: Option<f64> = None;
    let mut b_iter = map_b.iter().peekable();

    for (date_a, val_a) in &map_a {
        // Advance B until we pass date_a
        while let Some((date_b, val_b)) = b_iter.peek() {
            if *date_b <= date_a {
                last_b_val = Some(**val_b);
                b_iter.next();
            } else {
                break;
            }
        }

        if let Some(val_b) = last_b_val {
            result.push((*date_a, *val_a, val_b));
        }
    }

    result
}

/// `a - b` over the forward-filled alignment of the two series.
pub fn spread(series_a: &[DataPoint], series_b: &[DataPoint]) -> Vec<DataPoint> {
    align_series(series_a, series_b)
        .into_iter()
        .map(|(timestamp, a, b)| DataPoint { timestamp, value: a - b })
        .collect()
}

/// Most recent finite observation.
pub fn latest(series: &[DataPoint]) -> Option<&DataPoint> {
    series
        .iter()
        .filter(|dp| dp.value.is_finite())
        .max_by_key(|dp| dp.timestamp)
}

/// The last `points` observations, chronological.
pub fn trailing_history(series: &[DataPoint], points: usize) -> Vec<HistoryPoint> {
    let mut sorted: Vec<&DataPoint> = series.iter().filter(|dp| dp.value.is_finite()).collect();
    sorted.sort_by_key(|dp| dp.timestamp);
    let skip = sorted.len().saturating_sub(points);
    sorted.into_iter().skip(skip).map(HistoryPoint::from).collect()
}
