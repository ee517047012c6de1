use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

use crate::models::{DataPoint, GroundingSource};

pub mod fred;
pub mod gemini;
pub mod multpl;
pub mod put_call;
pub mod yahoo;

const API_USER_AGENT: &str = "MarketRiskIndex/0.1";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Chronological observations for `series_id`.
    async fn fetch_data(&self, series_id: &str) -> Result<Vec<DataPoint>>;

    /// Citation attached to values read from `series_id`.
    fn citation(&self, series_id: &str) -> GroundingSource;
}

/// Client for JSON APIs.
pub(crate) fn api_client(timeout: Duration) -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(API_USER_AGENT));

    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Client for scraped HTML pages, which often reject non-browser agents.
pub(crate) fn browser_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}
