use super::CalculatedIndicator;
use crate::core::timeseries::spread;
use crate::models::DataPoint;
use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// 10Y minus 2Y Treasury constant maturity, rebuilt from the two legs when
/// the published T10Y2Y series is unavailable.
pub struct YieldCurve10Y2Y;

#[async_trait]
impl CalculatedIndicator for YieldCurve10Y2Y {
    fn slug(&self) -> &str {
        "yield_curve_10y_2y"
    }

    fn name(&self) -> &str {
        "Yield Curve Spread (10Y - 2Y)"
    }

    fn required_inputs(&self) -> Vec<&str> {
        vec!["DGS10", "DGS2"]
    }

    async fn calculate(&self, inputs: Vec<Vec<DataPoint>>) -> Result<Vec<DataPoint>> {
        if inputs.len() < 2 {
            return Err(anyhow!("Spread calculation requires 2 inputs: 10Y (DGS10) and 2Y (DGS2)"));
        }
        Ok(spread(&inputs[0], &inputs[1]))
    }
}
