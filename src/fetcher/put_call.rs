use async_trait::async_trait;
use crate::models::{DataPoint, GroundingSource};
use super::DataSource;
use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

/// Scrapes a daily options statistics page for a labelled ratio row such as
/// `EQUITY PUT/CALL RATIO | 0.71`.
///
/// The reading is stamped with the session date the page carries, so an old
/// page ages out like any other stale series.
pub struct PutCallFetcher {
    url: String,
    client: Client,
}

impl PutCallFetcher {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            client: super::browser_client(timeout),
        }
    }

    /// Finds the first table row whose label cell matches `label` and returns
    /// the numeric value in its last cell.
    pub(crate) fn parse_ratio(body: &str, label: &str) -> Result<f64> {
        let document = Html::parse_document(body);
        let row_selector = Selector::parse("tr").map_err(|e| anyhow!("Invalid row selector: {:?}", e))?;
        let cell_selector = Selector::parse("td, th").map_err(|e| anyhow!("Invalid cell selector: {:?}", e))?;
        let wanted = normalize_label(label);

        for row in document.select(&row_selector) {
            let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
            if cells.len() < 2 {
                continue;
            }
            if normalize_label(&cell_text(&cells[0])) != wanted {
                continue;
            }
            let raw = cell_text(&cells[cells.len() - 1]);
            return raw
                .parse::<f64>()
                .map_err(|_| anyhow!("Row '{}' has non-numeric value '{}'", label, raw));
        }

        Err(anyhow!("Row '{}' not found on put/call page", label))
    }

    /// Session date shown on the page. Candidates are tried in `CANDIDATES`
    /// order and the first `YYYY-MM-DD` prefix wins.
    pub(crate) fn parse_as_of(body: &str) -> Option<DateTime<Utc>> {
        const CANDIDATES: [(&str, &str); 3] = [
            ("time[datetime]", "datetime"),
            ("input[name='dt'][value]", "value"),
            ("[data-date]", "data-date"),
        ];

        let document = Html::parse_document(body);
        CANDIDATES.iter().find_map(|(css, attr)| {
            let selector = Selector::parse(css).ok()?;
            document
                .select(&selector)
                .filter_map(|el| el.value().attr(attr))
                .find_map(parse_session_date)
        })
    }
}

fn parse_session_date(raw: &str) -> Option<DateTime<Utc>> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn normalize_label(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(':')
        .to_uppercase()
}

#[async_trait]
impl DataSource for PutCallFetcher {
    fn name(&self) -> &str {
        "PutCall"
    }

    async fn fetch_data(&self, label: &str) -> Result<Vec<DataPoint>> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("Put/Call page error: {}", resp.status()));
        }

        let body = resp.text().await?;
        let value = Self::parse_ratio(&body, label)?;
        debug!("Put/Call page: {} = {}", label, value);

        let timestamp = match Self::parse_as_of(&body) {
            Some(as_of) => as_of,
            None => {
                debug!("Put/Call page carries no session date, stamping now");
                Utc::now()
            }
        };
        Ok(vec![DataPoint { timestamp, value }])
    }

    fn citation(&self, label: &str) -> GroundingSource {
        GroundingSource::new(format!("Options statistics: {}", label), self.url.clone())
    }
}
