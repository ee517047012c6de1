use crate::models::{DataPoint, GroundingSource};
use super::DataSource;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Utc, TimeZone};
use std::time::Duration;
use yahoo_finance_api as yahoo;
use time::OffsetDateTime;

/// Daily closes from Yahoo Finance (used for `^VIX`).
pub struct YahooFetcher {
    timeout: Duration,
    lookback_days: i64,
}

impl YahooFetcher {
    pub fn new(timeout: Duration, lookback_days: i64) -> Self {
        Self { timeout, lookback_days: lookback_days.max(1) }
    }
}

#[async_trait]
impl DataSource for YahooFetcher {
    fn name(&self) -> &str {
        "Yahoo"
    }

    async fn fetch_data(&self, symbol: &str) -> Result<Vec<DataPoint>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| anyhow!("Failed to init Yahoo Connector: {}", e))?;

        // Yahoo API uses the 'time' crate instead of 'chrono'
        let now = OffsetDateTime::now_utc();
        let start = now - time::Duration::days(self.lookback_days);

        let resp = tokio::time::timeout(self.timeout, provider.get_quote_history(symbol, start, now))
            .await
            .map_err(|_| anyhow!("Yahoo request for {} timed out", symbol))?
            .map_err(|e| anyhow!("Yahoo API Error: {}", e))?;

        let quotes = resp.quotes()
            .map_err(|e| anyhow!("Failed to parse Yahoo quotes: {}", e))?;

        let mut data_points = Vec::new();

        for quote in quotes {
            // Yahoo quotes carry a unix timestamp in seconds
            if let Some(timestamp) = Utc.timestamp_opt(quote.timestamp as i64, 0).single() {
                data_points.push(DataPoint {
                    timestamp,
                    value: quote.close,
                });
            }
        }

        if data_points.is_empty() {
            return Err(anyhow!("No data returned for symbol: {}", symbol));
        }

        data_points.sort_by_key(|k| k.timestamp);

        Ok(data_points)
    }

    fn citation(&self, symbol: &str) -> GroundingSource {
        GroundingSource::new(
            format!("Yahoo Finance: {}", symbol),
            format!("https://finance.yahoo.com/quote/{}", symbol.replace('^', "%5E")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_escapes_index_symbols() {
        let fetcher = YahooFetcher::new(Duration::from_secs(5), 90);
        let citation = fetcher.citation("^VIX");
        assert_eq!(citation.uri, "https://finance.yahoo.com/quote/%5EVIX");
        assert_eq!(citation.title, "Yahoo Finance: ^VIX");
    }
}
