//! Grounded-search source: asks Gemini, with Google Search grounding enabled,
//! for the latest value of each requested indicator in a `LABEL: value`
//! layout, and keeps the grounding chunks as citations.

use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::rate_limiter::Cooldown;
use crate::models::GroundingSource;

/// One requested value: the label the model must echo and a description.
#[derive(Debug, Clone, Copy)]
pub struct SearchQuery<'a> {
    pub label: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSnapshot {
    pub values: HashMap<String, f64>,
    pub sources: Vec<GroundingSource>,
}

pub struct GroundedSearch {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    cooldown: Cooldown,
}

impl GroundedSearch {
    pub fn new(api_key: String, model: &str, base_url: &str, timeout: Duration, cooldown: Duration) -> Self {
        Self {
            api_key,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: super::api_client(timeout),
            cooldown: Cooldown::new(cooldown),
        }
    }

    pub async fn is_rate_limited(&self) -> bool {
        self.cooldown.is_active().await
    }

    pub async fn fetch_snapshot(&self, queries: &[SearchQuery<'_>]) -> Result<SearchSnapshot> {
        if queries.is_empty() {
            return Ok(SearchSnapshot::default());
        }
        if let Some(left) = self.cooldown.remaining().await {
            return Err(anyhow!("Gemini rate limited, retry in {}s", left.as_secs()));
        }

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(queries) }] }],
            "tools": [{ "google_search": {} }],
        });

        info!("Grounded search for {} indicator(s) via {}", queries.len(), self.model);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.cooldown.trip().await;
            warn!("Gemini returned 429, pausing grounded search");
            return Err(anyhow!("Gemini API rate limited (429)"));
        }
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API Error: {} - Body: {}", status, error_text));
        }

        let json: Value = resp.json().await?;
        let snapshot = parse_response(&json, queries)?;
        debug!("Grounded search parsed {:?}", snapshot.values);
        Ok(snapshot)
    }
}

fn build_prompt(queries: &[SearchQuery<'_>]) -> String {
    let mut prompt = format!(
        "Retrieve the most recent values for these {} US market indicators.\n",
        queries.len()
    );
    for (i, q) in queries.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, q.description));
    }
    prompt.push_str("\nReply with plain text only, one line per indicator, exactly in this format:\n");
    for q in queries {
        prompt.push_str(&format!("{}: [value]\n", q.label));
    }
    prompt
}

fn parse_response(json: &Value, queries: &[SearchQuery<'_>]) -> Result<SearchSnapshot> {
    let candidate = json["candidates"]
        .get(0)
        .ok_or_else(|| anyhow!("No candidates in Gemini response"))?;

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(anyhow!("Gemini response has no text"));
    }

    let values = queries
        .iter()
        .filter_map(|q| parse_labelled_value(&text, q.label).map(|v| (q.label.to_string(), v)))
        .collect();

    let sources = candidate["groundingMetadata"]["groundingChunks"]
        .as_array()
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| {
                    let uri = chunk["web"]["uri"].as_str()?;
                    let title = chunk["web"]["title"].as_str().unwrap_or("Market Source");
                    Some(GroundingSource::new(title, uri))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(SearchSnapshot { values, sources })
}

/// Extracts the number after the first standalone `LABEL:` in `text`.
///
/// Markdown emphasis is ignored. Returns `None` when the label is missing or
/// not followed by a finite number.
pub fn parse_labelled_value(text: &str, label: &str) -> Option<f64> {
    let cleaned = text.replace('*', "");
    let needle = format!("{}:", label);

    for (idx, _) in cleaned.match_indices(&needle) {
        let standalone = cleaned[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        if !standalone {
            continue;
        }

        let rest = cleaned[idx + needle.len()..].trim_start();
        let number: String = rest
            .char_indices()
            .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-'))
            .map(|(_, c)| c)
            .collect();

        if let Ok(value) = number.trim_end_matches('.').parse::<f64>() {
            if value.is_finite() {
                return Some(value);
            }
        }
    }

    None
}
