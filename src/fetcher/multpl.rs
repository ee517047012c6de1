use async_trait::async_trait;
use crate::models::{DataPoint, GroundingSource};
use super::DataSource;
use anyhow::{Result, anyhow};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Monthly tables from multpl.com, e.g. `s-p-500-pe-ratio`.
pub struct MultplFetcher {
    base_url: String,
    client: Client,
}

impl MultplFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: super::browser_client(timeout),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/table/by-month", self.base_url, table)
    }

    pub(crate) fn parse_table(body: &str) -> Result<Vec<DataPoint>> {
        let document = Html::parse_document(body);

        let row_selector = Selector::parse("table#datatable tbody tr")
            .map_err(|e| anyhow!("Invalid row selector: {:?}", e))?;
        let col_selector = Selector::parse("td")
            .map_err(|e| anyhow!("Invalid cell selector: {:?}", e))?;

        let mut points = Vec::new();

        for row in document.select(&row_selector) {
            let cols: Vec<_> = row.select(&col_selector).collect();
            if cols.len() < 2 {
                continue;
            }

            // Column 0: "Jan 1, 2026" or "Jan 1, 2026 Estimate"
            let date_raw = cols[0].text().collect::<Vec<_>>().join(" ");
            let date_clean = date_raw.replace("Estimate", "").trim().to_string();

            // Column 1: "31.52", "† 31.52", "31.52 Estimate"
            let val_raw = cols[1].text().collect::<Vec<_>>().join("");
            let val_clean: String = val_raw
                .replace('†', "")
                .replace("Estimate", "")
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();

            let naive_date = chrono::NaiveDate::parse_from_str(&date_clean, "%b %d, %Y")
                .or_else(|_| chrono::NaiveDate::parse_from_str(&date_clean, "%B %d, %Y"));

            if let (Ok(date), Ok(value)) = (naive_date, val_clean.parse::<f64>()) {
                if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                    points.push(DataPoint { timestamp: midnight.and_utc(), value });
                }
            }
        }

        points.sort_by_key(|p| p.timestamp);

        if points.is_empty() {
            return Err(anyhow!("No data found parsing multpl.com (Selector match failed?)"));
        }

        Ok(points)
    }
}

#[async_trait]
impl DataSource for MultplFetcher {
    fn name(&self) -> &str {
        "multpl"
    }

    async fn fetch_data(&self, table: &str) -> Result<Vec<DataPoint>> {
        let resp = self.client.get(self.table_url(table)).send().await?;

        if !resp.status().is_success() {
            return Err(anyhow!("Multpl Error: {}", resp.status()));
        }

        let body = resp.text().await?;
        Self::parse_table(&body)
    }

    fn citation(&self, table: &str) -> GroundingSource {
        GroundingSource::new(format!("multpl.com: {}", table), self.table_url(table))
    }
}
