use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::analysis::aggregate;
use crate::config::{Settings, STALENESS_DAYS_RANGE};
use crate::core::rate_limiter::RateLimiter;
use crate::core::timeseries::{latest, trailing_history};
use crate::fetcher::fred::FredFetcher;
use crate::fetcher::gemini::{GroundedSearch, SearchQuery};
use crate::fetcher::multpl::MultplFetcher;
use crate::fetcher::put_call::PutCallFetcher;
use crate::fetcher::yahoo::YahooFetcher;
use crate::fetcher::DataSource;
use crate::indicators::registry::{Catalog, IndicatorDefinition, Registry, SourceRef, SourceType};
use crate::models::{DataPoint, GroundingSource, ObservedIndicator, Provenance, RawReading, RiskData};

/// How a refresh was fed, reported alongside the score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSummary {
    pub live: usize,
    pub secondary: usize,
    pub search: usize,
    pub fallback_ids: Vec<String>,
    /// No indicator obtained a value from any upstream source.
    pub all_fallback: bool,
}

impl FeedSummary {
    fn from_readings(readings: &[RawReading]) -> Self {
        let mut summary = FeedSummary::default();
        for reading in readings {
            match reading.provenance {
                Provenance::Live { .. } => summary.live += 1,
                Provenance::Secondary { .. } => summary.secondary += 1,
                Provenance::Search => summary.search += 1,
                Provenance::Fallback => summary.fallback_ids.push(reading.id.clone()),
            }
        }
        summary.all_fallback = !readings.is_empty() && summary.fallback_ids.len() == readings.len();
        summary
    }
}

#[derive(Debug, Clone)]
pub struct Refresh {
    pub data: RiskData,
    pub feed: FeedSummary,
}

/// Result of probing one direct source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub indicator: &'static str,
    pub source: String,
    pub value: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Resolves every catalog indicator through its source chain and scores the
/// complete set.
///
/// Chain per indicator: primary source, secondary source, one batched
/// grounded search, then the registry fallback constant.
pub struct Collector {
    catalog: Catalog,
    definitions: &'static [IndicatorDefinition],
    sources: HashMap<SourceType, Box<dyn DataSource>>,
    search: Option<GroundedSearch>,
    limiter: RateLimiter,
    history_points: usize,
    max_staleness: ChronoDuration,
    offline: bool,
}

impl Collector {
    /// Wires the standard fetchers from settings. Missing API keys simply
    /// leave those sources out of the chain.
    pub fn from_settings(settings: &Settings, offline: bool) -> Result<Self> {
        let timeout = settings.request_timeout();
        // Headroom for holidays and "." rows
        let fetch_window = settings.history_points.max(1) * 2 + 10;

        let mut sources: HashMap<SourceType, Box<dyn DataSource>> = HashMap::new();
        match &settings.fred_api_key {
            Some(key) => {
                sources.insert(
                    SourceType::Fred,
                    Box::new(FredFetcher::new(key.clone(), &settings.fred_base_url, timeout, fetch_window)),
                );
            }
            None => warn!("FRED_API_KEY not set; FRED-backed indicators will use other sources"),
        }
        sources.insert(SourceType::Yahoo, Box::new(YahooFetcher::new(timeout, fetch_window as i64)));
        sources.insert(SourceType::Multpl, Box::new(MultplFetcher::new(&settings.multpl_base_url, timeout)));
        sources.insert(SourceType::PutCallPage, Box::new(PutCallFetcher::new(&settings.put_call_url, timeout)));

        let search = settings.gemini_api_key.as_ref().map(|key| {
            GroundedSearch::new(
                key.clone(),
                &settings.gemini_model,
                &settings.gemini_base_url,
                timeout,
                settings.search_cooldown(),
            )
        });

        let catalog = Registry::catalog().context("Indicator catalog is misconfigured")?;
        Ok(Self::new(catalog, sources, search, settings, offline))
    }

    pub fn new(
        catalog: Catalog,
        sources: HashMap<SourceType, Box<dyn DataSource>>,
        search: Option<GroundedSearch>,
        settings: &Settings,
        offline: bool,
    ) -> Self {
        Self {
            catalog,
            definitions: Registry::get_all_indicators(),
            sources,
            search,
            limiter: RateLimiter::new(settings.throttle),
            history_points: settings.history_points,
            max_staleness: ChronoDuration::days(settings.max_staleness_days.clamp(*STALENESS_DAYS_RANGE.start(), *STALENESS_DAYS_RANGE.end())),
            offline,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// One full refresh: fetch, degrade, score.
    pub async fn refresh(&self) -> Result<Refresh> {
        // Phase 1: direct sources, all indicators in parallel
        let mut resolved: Vec<Option<RawReading>> = if self.offline {
            info!("Offline mode: scoring from fallback values");
            vec![None; self.definitions.len()]
        } else {
            join_all(self.definitions.iter().map(|def| self.resolve_direct(def))).await
        };

        // Phase 2: one grounded search for whatever is still missing
        if !self.offline {
            self.fill_from_search(&mut resolved).await;
        }

        // Phase 3: fallback constants
        let readings: Vec<RawReading> = self
            .definitions
            .iter()
            .zip(resolved)
            .map(|(def, reading)| reading.unwrap_or_else(|| fallback_reading(def)))
            .collect();

        let feed = FeedSummary::from_readings(&readings);
        if feed.all_fallback {
            warn!("No live data obtained; score is built entirely from fallback values");
        } else if !feed.fallback_ids.is_empty() {
            warn!("Using fallback values for: {}", feed.fallback_ids.join(", "));
        }

        let data = self.score(readings)?;
        info!("Risk score {} ({})", data.total_score, data.level());
        Ok(Refresh { data, feed })
    }

    fn score(&self, readings: Vec<RawReading>) -> Result<RiskData> {
        // Direct-source citations first, grounding chunks after
        let (searched, direct): (Vec<&RawReading>, Vec<&RawReading>) =
            readings.iter().partition(|r| r.provenance == Provenance::Search);
        let sources = dedup_sources(
            direct
                .into_iter()
                .chain(searched)
                .flat_map(|r| r.citations.iter().cloned()),
        );

        let mut indicators = Vec::with_capacity(readings.len());
        for reading in readings {
            let spec = self
                .catalog
                .get(&reading.id)
                .cloned()
                .ok_or_else(|| anyhow!("Indicator '{}' is not in the catalog", reading.id))?;
            indicators.push(ObservedIndicator::observe(spec, reading.value, reading.history, reading.provenance)?);
        }

        Ok(aggregate(&self.catalog, indicators, sources)?)
    }

    /// Tries every direct source of every indicator once, without falling
    /// through. Used by the `check_sources` diagnostic.
    pub async fn probe_sources(&self) -> Vec<SourceStatus> {
        let mut statuses = Vec::new();
        for def in self.definitions {
            for source in def.sources() {
                let outcome = match self.read_source(&source).await {
                    Ok((series, _)) => self.accept(def.id, &series).map(|p| (p.value, p.timestamp)),
                    Err(e) => Err(e),
                };
                let (value, observed_at, error) = match outcome {
                    Ok((value, ts)) => (Some(value), Some(ts), None),
                    Err(e) => (None, None, Some(format!("{:#}", e))),
                };
                statuses.push(SourceStatus {
                    indicator: def.id,
                    source: source_label(&source),
                    value,
                    observed_at,
                    error,
                });
            }
        }
        statuses
    }

    async fn resolve_direct(&self, def: &IndicatorDefinition) -> Option<RawReading> {
        for (tier, source) in def.sources().into_iter().enumerate() {
            match self.read_source(&source).await {
                Ok((series, citations)) => match self.accept(def.id, &series) {
                    Ok(point) => {
                        let source_name = source_label(&source);
                        debug!("{}: {} from {}", def.id, point.value, source_name);
                        let provenance = if tier == 0 {
                            Provenance::Live { source: source_name }
                        } else {
                            Provenance::Secondary { source: source_name }
                        };
                        return Some(RawReading {
                            id: def.id.to_string(),
                            value: point.value,
                            history: trailing_history(&series, self.history_points),
                            provenance,
                            citations,
                        });
                    }
                    Err(e) => warn!("{}: rejected {} reading: {}", def.id, source_label(&source), e),
                },
                Err(e) => warn!("{}: {} failed: {:#}", def.id, source_label(&source), e),
            }
        }
        None
    }

    async fn read_source(&self, source: &SourceRef) -> Result<(Vec<DataPoint>, Vec<GroundingSource>)> {
        if source.source == SourceType::Calculated {
            return self.calculate(source.symbol).await;
        }

        let fetcher = self
            .sources
            .get(&source.source)
            .ok_or_else(|| anyhow!("{} source is not configured", source.source.label()))?;

        self.limiter.wait(source.source).await;
        let series = fetcher
            .fetch_data(source.symbol)
            .await
            .with_context(|| format!("{} fetch failed for {}", fetcher.name(), source.symbol))?;
        Ok((series, vec![fetcher.citation(source.symbol)]))
    }

    async fn calculate(&self, slug: &str) -> Result<(Vec<DataPoint>, Vec<GroundingSource>)> {
        let calculator = Registry::get_calculator(slug)
            .ok_or_else(|| anyhow!("Calculator implementation not found for {}", slug))?;
        let fred = self
            .sources
            .get(&SourceType::Fred)
            .ok_or_else(|| anyhow!("{} needs FRED, which is not configured", slug))?;

        let mut inputs = Vec::new();
        let mut citations = Vec::new();
        for series_id in calculator.required_inputs() {
            self.limiter.wait(SourceType::Fred).await;
            let data = fred
                .fetch_data(series_id)
                .await
                .with_context(|| format!("{} fetch failed for {} input {}", fred.name(), calculator.slug(), series_id))?;
            inputs.push(data);
            citations.push(fred.citation(series_id));
        }

        let series = calculator
            .calculate(inputs)
            .await
            .with_context(|| format!("Calculation failed for {} ({})", calculator.name(), calculator.slug()))?;
        debug!("{}: {} points calculated", calculator.slug(), series.len());
        Ok((series, citations))
    }

    /// Latest usable point, or why the series cannot be used.
    fn accept<'a>(&self, id: &str, series: &'a [DataPoint]) -> Result<&'a DataPoint> {
        let point = latest(series).ok_or_else(|| anyhow!("no finite observations for {}", id))?;
        let age = Utc::now() - point.timestamp;
        if age > self.max_staleness {
            return Err(anyhow!(
                "latest observation {} is {} days old",
                point.timestamp.date_naive(),
                age.num_days()
            ));
        }
        Ok(point)
    }

    async fn fill_from_search(&self, resolved: &mut [Option<RawReading>]) {
        let Some(search) = &self.search else {
            return;
        };

        let missing: Vec<(usize, &IndicatorDefinition)> = self
            .definitions
            .iter()
            .enumerate()
            .filter(|(i, _)| resolved[*i].is_none())
            .collect();
        if missing.is_empty() {
            return;
        }

        let queries: Vec<SearchQuery> = missing
            .iter()
            .map(|(_, def)| SearchQuery { label: def.search_label, description: def.name })
            .collect();

        let snapshot = match search.fetch_snapshot(&queries).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Grounded search unavailable: {:#}", e);
                return;
            }
        };

        let mut cited = false;
        for (i, def) in missing {
            let Some(&value) = snapshot.values.get(def.search_label) else {
                continue;
            };
            // Attach the shared citations to the first search-fed reading only
            let citations = if cited { Vec::new() } else { snapshot.sources.clone() };
            cited = true;
            resolved[i] = Some(RawReading {
                id: def.id.to_string(),
                value,
                history: Vec::new(),
                provenance: Provenance::Search,
                citations,
            });
        }
    }
}

fn fallback_reading(def: &IndicatorDefinition) -> RawReading {
    RawReading {
        id: def.id.to_string(),
        value: def.fallback,
        history: Vec::new(),
        provenance: Provenance::Fallback,
        citations: Vec::new(),
    }
}

fn source_label(source: &SourceRef) -> String {
    format!("{} {}", source.source.label(), source.symbol)
}

/// Keeps the first citation per URI, in order.
fn dedup_sources(sources: impl Iterator<Item = GroundingSource>) -> Vec<GroundingSource> {
    let mut seen = HashSet::new();
    sources.filter(|s| seen.insert(s.uri.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(id: &str, provenance: Provenance) -> RawReading {
        RawReading { id: id.into(), value: 1.0, history: Vec::new(), provenance, citations: Vec::new() }
    }

    #[test]
    fn test_feed_summary_counts() {
        let readings = vec![
            reading("vix", Provenance::Live { source: "Yahoo ^VIX".into() }),
            reading("yield-curve", Provenance::Secondary { source: "Calculated".into() }),
            reading("hy-spread", Provenance::Search),
            reading("pe-ratio", Provenance::Fallback),
        ];
        let summary = FeedSummary::from_readings(&readings);
        assert_eq!(summary.live, 1);
        assert_eq!(summary.secondary, 1);
        assert_eq!(summary.search, 1);
        assert_eq!(summary.fallback_ids, vec!["pe-ratio".to_string()]);
        assert!(!summary.all_fallback);

        let all = vec![reading("vix", Provenance::Fallback)];
        assert!(FeedSummary::from_readings(&all).all_fallback);
    }

    #[test]
    fn test_dedup_sources_keeps_first() {
        let sources = vec![
            GroundingSource::new("FRED: DGS10", "https://fred.stlouisfed.org/series/DGS10"),
            GroundingSource::new("again", "https://fred.stlouisfed.org/series/DGS10"),
            GroundingSource::new("FRED: DGS2", "https://fred.stlouisfed.org/series/DGS2"),
        ];
        let deduped = dedup_sources(sources.into_iter());
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "FRED: DGS10");
    }

    struct FailingSource;

    #[async_trait::async_trait]
    impl DataSource for FailingSource {
        fn name(&self) -> &str {
            "stub-feed"
        }

        async fn fetch_data(&self, _series_id: &str) -> Result<Vec<DataPoint>> {
            Err(anyhow!("connection refused"))
        }

        fn citation(&self, series_id: &str) -> GroundingSource {
            GroundingSource::new(series_id, format!("https://example.invalid/{}", series_id))
        }
    }

    #[tokio::test]
    async fn test_fetch_errors_name_the_failing_feed() {
        let settings = Settings { throttle: false, ..Settings::default() };
        let mut sources: HashMap<SourceType, Box<dyn DataSource>> = HashMap::new();
        sources.insert(SourceType::Fred, Box::new(FailingSource));
        let collector = Collector::new(Registry::catalog().unwrap(), sources, None, &settings, false);

        let statuses = collector.probe_sources().await;
        let hy = statuses.iter().find(|s| s.indicator == "hy-spread").unwrap();
        let error = hy.error.as_deref().unwrap();
        assert!(error.contains("stub-feed fetch failed for BAMLH0A0HYM2"), "{}", error);
        assert!(error.contains("connection refused"), "{}", error);

        let calculated = statuses
            .iter()
            .find(|s| s.source == "Calculated yield_curve_10y_2y")
            .unwrap();
        let error = calculated.error.as_deref().unwrap();
        assert!(error.contains("stub-feed fetch failed for yield_curve_10y_2y input DGS10"), "{}", error);
    }

    #[tokio::test]
    async fn test_offline_refresh_uses_fallback_table() {
        let settings = Settings { throttle: false, ..Settings::default() };
        let collector = Collector::new(Registry::catalog().unwrap(), HashMap::new(), None, &settings, true);

        let refresh = collector.refresh().await.unwrap();
        assert!(refresh.feed.all_fallback);
        assert_eq!(refresh.data.indicators.len(), 6);
        assert!(refresh.data.sources.is_empty());

        let vix = refresh.data.indicator("vix").unwrap();
        assert_eq!(vix.value, 16.2);
        // (16.2 - 10) / 25 * 100 = 24.8
        assert_eq!(vix.sub_score, 25);
        assert!(vix.provenance.is_fallback());
    }
}
