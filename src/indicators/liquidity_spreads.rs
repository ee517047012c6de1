use super::CalculatedIndicator;
use crate::core::timeseries::spread;
use crate::models::DataPoint;
use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// 3M AA financial commercial paper minus 3M T-bill. Stands in for the TED
/// spread, whose LIBOR leg no longer publishes.
pub struct CommercialPaperSpread;

#[async_trait]
impl CalculatedIndicator for CommercialPaperSpread {
    fn slug(&self) -> &str {
        "cp_bill_spread"
    }

    fn name(&self) -> &str {
        "Commercial Paper Spread"
    }

    fn required_inputs(&self) -> Vec<&str> {
        vec!["DCPF3M", "DTB3"]
    }

    async fn calculate(&self, inputs: Vec<Vec<DataPoint>>) -> Result<Vec<DataPoint>> {
        if inputs.len() < 2 {
            return Err(anyhow!("CP Spread requires 2 inputs: CP 3M and T-Bill 3M"));
        }

        // Spread = CP Rate - Risk Free Rate
        Ok(spread(&inputs[0], &inputs[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_bill_leg_forward_fills() {
        let day = |d: u32| Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap();
        let cp = vec![
            DataPoint { timestamp: day(2), value: 5.40 },
            DataPoint { timestamp: day(3), value: 5.45 },
        ];
        // Bill only printed on the 1st; its value carries forward
        let bill = vec![DataPoint { timestamp: day(1), value: 5.25 }];

        let result = CommercialPaperSpread.calculate(vec![cp, bill]).await.unwrap();
        assert_eq!(result.len(), 2);
        assert!((result[0].value - 0.15).abs() < 1e-9);
        assert!((result[1].value - 0.20).abs() < 1e-9);
    }
}
