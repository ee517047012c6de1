//! Runtime settings.
//!
//! Values come from the process environment, after `dotenvy` has merged any
//! `.env` file. API keys are handed to each fetcher at construction; nothing
//! here is global.

use anyhow::{ensure, Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MULTPL_BASE_URL: &str = "https://www.multpl.com";
pub const DEFAULT_PUT_CALL_URL: &str = "https://www.cboe.com/us/options/market_statistics/daily/";

/// Accepted range for `RISK_MAX_STALENESS_DAYS`.
pub const STALENESS_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;

#[derive(Debug, Clone)]
pub struct Settings {
    pub fred_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub fred_base_url: String,
    pub gemini_base_url: String,
    pub multpl_base_url: String,
    pub put_call_url: String,
    /// Trailing observations kept per indicator for display.
    pub history_points: usize,
    /// Readings older than this fall through to the next source.
    pub max_staleness_days: i64,
    pub request_timeout_secs: u64,
    pub search_cooldown_secs: u64,
    /// Jittered pause before each upstream request.
    pub throttle: bool,
    pub watch_cron: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fred_api_key: None,
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
            fred_base_url: DEFAULT_FRED_BASE_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            multpl_base_url: DEFAULT_MULTPL_BASE_URL.to_string(),
            put_call_url: DEFAULT_PUT_CALL_URL.to_string(),
            history_points: 30,
            max_staleness_days: 45,
            request_timeout_secs: 15,
            search_cooldown_secs: 600,
            throttle: true,
            watch_cron: "0 0 */6 * * *".to_string(),
        }
    }
}

impl Settings {
    /// Load `.env` (if present) and read settings from the environment.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let max_staleness_days = parse_or(text("RISK_MAX_STALENESS_DAYS"), "RISK_MAX_STALENESS_DAYS", defaults.max_staleness_days)?;
        ensure!(
            STALENESS_DAYS_RANGE.contains(&max_staleness_days),
            "RISK_MAX_STALENESS_DAYS must be between {} and {} days, got {}",
            STALENESS_DAYS_RANGE.start(),
            STALENESS_DAYS_RANGE.end(),
            max_staleness_days
        );

        Ok(Self {
            fred_api_key: text("FRED_API_KEY"),
            gemini_api_key: text("GEMINI_API_KEY"),
            gemini_model: text("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            fred_base_url: text("FRED_BASE_URL").unwrap_or(defaults.fred_base_url),
            gemini_base_url: text("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            multpl_base_url: text("MULTPL_BASE_URL").unwrap_or(defaults.multpl_base_url),
            put_call_url: text("RISK_PUT_CALL_URL").unwrap_or(defaults.put_call_url),
            history_points: parse_or(text("RISK_HISTORY_POINTS"), "RISK_HISTORY_POINTS", defaults.history_points)?,
            max_staleness_days,
            request_timeout_secs: parse_or(text("RISK_REQUEST_TIMEOUT_SECS"), "RISK_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            search_cooldown_secs: parse_or(text("RISK_SEARCH_COOLDOWN_SECS"), "RISK_SEARCH_COOLDOWN_SECS", defaults.search_cooldown_secs)?,
            throttle: parse_or(text("RISK_THROTTLE"), "RISK_THROTTLE", defaults.throttle)?,
            watch_cron: text("RISK_WATCH_CRON").unwrap_or(defaults.watch_cron),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_cooldown(&self) -> Duration {
        Duration::from_secs(self.search_cooldown_secs)
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("Invalid value for {}: '{}'", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert!(settings.fred_api_key.is_none());
        assert_eq!(settings.history_points, 30);
        assert_eq!(settings.max_staleness_days, 45);
        assert!(settings.throttle);
        assert_eq!(settings.fred_base_url, DEFAULT_FRED_BASE_URL);
    }

    #[test]
    fn test_overrides_and_blank_keys() {
        let settings = Settings::from_lookup(lookup(&[
            ("FRED_API_KEY", "  abcdef  "),
            ("GEMINI_API_KEY", "   "),
            ("RISK_HISTORY_POINTS", "60"),
            ("RISK_THROTTLE", "false"),
        ]))
        .unwrap();
        assert_eq!(settings.fred_api_key.as_deref(), Some("abcdef"));
        assert!(settings.gemini_api_key.is_none());
        assert_eq!(settings.history_points, 60);
        assert!(!settings.throttle);
    }

    #[test]
    fn test_bad_number_is_error() {
        let err = Settings::from_lookup(lookup(&[("RISK_MAX_STALENESS_DAYS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("RISK_MAX_STALENESS_DAYS"));
    }

    #[test]
    fn test_staleness_days_out_of_range() {
        for raw in ["-5", "0", "3651", "999999999999"] {
            let err = Settings::from_lookup(lookup(&[("RISK_MAX_STALENESS_DAYS", raw)])).unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("must be between 1 and 3650"), "{}: {}", raw, msg);
        }

        let settings = Settings::from_lookup(lookup(&[("RISK_MAX_STALENESS_DAYS", "3650")])).unwrap();
        assert_eq!(settings.max_staleness_days, 3650);
    }
}
