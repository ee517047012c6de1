use thiserror::Error;

/// Faults raised by the scoring core.
///
/// Configuration faults are raised while building a calibration or catalog and
/// never during aggregation. Input shape faults are raised when the caller hands
/// the aggregator an indicator set that does not match its catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    // Configuration faults
    #[error("configuration fault: calibration for '{id}' has min == max ({bound})")]
    DegenerateCalibration { id: String, bound: f64 },

    #[error("configuration fault: calibration for '{id}' has a non-finite bound")]
    NonFiniteCalibration { id: String },

    #[error("configuration fault: weight for '{id}' must be a finite non-negative number, got {weight}")]
    InvalidWeight { id: String, weight: f64 },

    #[error("configuration fault: indicator id '{0}' appears more than once")]
    DuplicateIndicator(String),

    #[error("configuration fault: catalog has no indicators")]
    EmptyCatalog,

    // Input shape faults
    #[error("input shape fault: expected {expected} indicators, got {actual}")]
    IndicatorCount { expected: usize, actual: usize },

    #[error("input shape fault: position {position} should be '{expected}', got '{actual}'")]
    IndicatorMismatch {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("input shape fault: indicator '{0}' carries a definition that differs from the catalog")]
    SpecMismatch(String),

    #[error("input shape fault: value for '{id}' is not finite ({value})")]
    NonFiniteValue { id: String, value: f64 },

    #[error("input shape fault: sub-score {actual} for '{id}' does not match its calibration (expected {expected})")]
    SubScoreMismatch { id: String, expected: u8, actual: u8 },
}

impl RiskError {
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            RiskError::DegenerateCalibration { .. }
                | RiskError::NonFiniteCalibration { .. }
                | RiskError::InvalidWeight { .. }
                | RiskError::DuplicateIndicator(_)
                | RiskError::EmptyCatalog
        )
    }

    pub fn is_input_shape_fault(&self) -> bool {
        !self.is_configuration_fault()
    }
}
