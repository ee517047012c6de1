use crate::models::DataPoint;
use anyhow::Result;
use async_trait::async_trait;

pub mod liquidity_spreads;
pub mod registry;
pub mod yield_curve;

/// An indicator series derived from other fetched series.
#[async_trait]
pub trait CalculatedIndicator {
    /// Returns the unique slug (e.g., "yield_curve_10y_2y")
    fn slug(&self) -> &str;

    /// Returns the display name
    fn name(&self) -> &str;

    /// Returns the FRED series ids required for calculation, in input order
    fn required_inputs(&self) -> Vec<&str>;

    /// Calculate the indicator data based on inputs.
    async fn calculate(&self, inputs: Vec<Vec<DataPoint>>) -> Result<Vec<DataPoint>>;
}
