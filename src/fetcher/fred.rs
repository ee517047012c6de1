use async_trait::async_trait;
use crate::models::{DataPoint, GroundingSource};
use super::DataSource;
use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::Value;
use chrono::{TimeZone, Utc};
use std::time::Duration;
use tracing::{debug, warn};

pub struct FredFetcher {
    api_key: String,
    base_url: String,
    client: Client,
    /// Most recent observations to request per series.
    limit: usize,
}

impl FredFetcher {
    pub fn new(api_key: String, base_url: &str, timeout: Duration, limit: usize) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: super::api_client(timeout),
            limit: limit.max(1),
        }
    }
}

#[async_trait]
impl DataSource for FredFetcher {
    fn name(&self) -> &str {
        "FRED"
    }

    async fn fetch_data(&self, series_id: &str) -> Result<Vec<DataPoint>> {
        // FRED keys are 32 lowercase alphanumerics
        let sanitized_key = self.api_key.trim().to_lowercase();

        if sanitized_key.is_empty() {
            return Err(anyhow!("FRED API Key is empty or missing!"));
        }

        if sanitized_key.len() != 32 {
            warn!("FRED API Key length is {}, not 32! This will likely fail.", sanitized_key.len());
        }

        let url = format!("{}/fred/series/observations", self.base_url);
        let limit = self.limit.to_string();
        debug!("FRED fetching {} (limit {})", series_id, limit);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("series_id", series_id),
                ("api_key", sanitized_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("FRED API Error: {} - Body: {}", status, error_text));
        }

        let json: Value = resp.json().await?;
        Self::parse_observations(&json)
    }

    fn citation(&self, series_id: &str) -> GroundingSource {
        GroundingSource::new(
            format!("FRED: {}", series_id),
            format!("https://fred.stlouisfed.org/series/{}", series_id),
        )
    }
}

impl FredFetcher {
    /// Parses an observations payload into ascending data points.
    pub(crate) fn parse_observations(json: &Value) -> Result<Vec<DataPoint>> {
        let observations = json["observations"]
            .as_array()
            .ok_or_else(|| anyhow!("No observations found in FRED response"))?;

        let mut data_points = Vec::new();

        for obs in observations {
            // "date": "2023-01-01", "value": "123.45"
            if let (Some(date_str), Some(value_str)) = (obs["date"].as_str(), obs["value"].as_str()) {
                // "." marks a missing observation (holidays, discontinued days)
                if value_str == "." {
                    continue;
                }

                if let Ok(value) = value_str.parse::<f64>() {
                    let naive_date = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")?;
                    let midnight = naive_date
                        .and_hms_opt(0, 0, 0)
                        .ok_or_else(|| anyhow!("Invalid FRED date: {}", date_str))?;
                    let timestamp = Utc.from_utc_datetime(&midnight);

                    data_points.push(DataPoint { timestamp, value });
                }
            }
        }

        // Requested newest first
        data_points.sort_by_key(|p| p.timestamp);

        Ok(data_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "abcdefabcdefabcdefabcdefabcdef12";

    #[test]
    fn test_parse_valid_response() {
        let json_data = json!({
            "observations": [
                { "date": "2023-01-02", "value": "124.56" },
                { "date": "2023-01-01", "value": "123.45" }
            ]
        });

        let points = FredFetcher::parse_observations(&json_data).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 123.45);
        assert_eq!(points[1].value, 124.56);
    }

    #[test]
    fn test_parse_missing_value() {
        let json_data = json!({
            "observations": [
                { "date": "2023-01-01", "value": "." },
                { "date": "2023-01-02", "value": "100.0" }
            ]
        });

        let points = FredFetcher::parse_observations(&json_data).unwrap();
        assert_eq!(points.len(), 1); // "." should be skipped
        assert_eq!(points[0].value, 100.0);
    }

    #[test]
    fn test_parse_invalid_format() {
        let json_data = json!({ "error": "bad request" });
        let result = FredFetcher::parse_observations(&json_data);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fred/series/observations"))
            .and(query_param("series_id", "T10Y2Y"))
            .and(query_param("sort_order", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "observations": [
                    { "date": "2024-06-04", "value": "-0.41" },
                    { "date": "2024-06-03", "value": "-0.39" }
                ]
            })))
            .mount(&server)
            .await;

        let fetcher = FredFetcher::new(KEY.to_string(), &server.uri(), Duration::from_secs(5), 30);
        let points = fetcher.fetch_data("T10Y2Y").await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].value, -0.41);
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request.  The value for variable api_key is not registered."))
            .mount(&server)
            .await;

        let fetcher = FredFetcher::new(KEY.to_string(), &server.uri(), Duration::from_secs(5), 30);
        let err = fetcher.fetch_data("BAMLH0A0HYM2").await.unwrap_err();
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn test_empty_key_fails_before_request() {
        let fetcher = FredFetcher::new("   ".to_string(), "http://127.0.0.1:9", Duration::from_secs(1), 30);
        let err = fetcher.fetch_data("TEDRATE").await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
