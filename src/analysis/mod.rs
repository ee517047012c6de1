//! Scoring core: pure functions over a complete indicator set.

pub mod aggregate;
pub mod market_status;
pub mod normalize;

pub use aggregate::{aggregate, aggregate_at};
pub use market_status::{MarketStatus, RiskLevel};
pub use normalize::{Calibration, Direction};
