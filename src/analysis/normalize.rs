use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Whether higher or lower raw readings signal more risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsRisky,
    LowerIsRisky,
}

/// Linear calibration band for one indicator.
///
/// `min` maps to a calm reading and `max` to a stressed one (before the
/// direction is applied). Only constructible through [`Calibration::new`], so a
/// degenerate band can never reach [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    #[serde(rename = "calibrationMin")]
    min: f64,
    #[serde(rename = "calibrationMax")]
    max: f64,
    direction: Direction,
}

impl Calibration {
    pub fn new(id: &str, min: f64, max: f64, direction: Direction) -> Result<Self, RiskError> {
        // The band width must be finite too, or interpolation yields NaN
        if !min.is_finite() || !max.is_finite() || !(max - min).is_finite() {
            return Err(RiskError::NonFiniteCalibration { id: id.to_string() });
        }
        if min == max {
            return Err(RiskError::DegenerateCalibration { id: id.to_string(), bound: min });
        }
        Ok(Self { min, max, direction })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Checked sub-score: rejects NaN and infinite readings.
    pub fn sub_score(&self, id: &str, value: f64) -> Result<u8, RiskError> {
        if !value.is_finite() {
            return Err(RiskError::NonFiniteValue { id: id.to_string(), value });
        }
        Ok(normalize(value, self))
    }
}

/// Maps a raw reading onto the 0-100 risk scale.
///
/// Interpolates linearly across the calibration band, inverts for
/// `LowerIsRisky`, clamps to `[0, 100]` and rounds to the nearest integer.
/// Callers check `value` first; [`Calibration::sub_score`] is the public entry.
pub(crate) fn normalize(value: f64, calibration: &Calibration) -> u8 {
    debug_assert!(value.is_finite(), "normalize called with non-finite value {}", value);
    let mut linear = (value - calibration.min) / (calibration.max - calibration.min) * 100.0;
    if calibration.direction == Direction::LowerIsRisky {
        linear = 100.0 - linear;
    }
    linear.clamp(0.0, 100.0).round() as u8
}
