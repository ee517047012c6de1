use chrono::{Duration as ChronoDuration, Utc};
use market_risk_lib::config::Settings;
use market_risk_lib::core::orchestrator::Collector;
use market_risk_lib::fetcher::fred::FredFetcher;
use market_risk_lib::fetcher::gemini::GroundedSearch;
use market_risk_lib::fetcher::multpl::MultplFetcher;
use market_risk_lib::fetcher::put_call::PutCallFetcher;
use market_risk_lib::fetcher::DataSource;
use market_risk_lib::indicators::registry::{Registry, SourceType};
use market_risk_lib::models::Provenance;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "abcdefabcdefabcdefabcdefabcdef12";
const TIMEOUT: Duration = Duration::from_secs(5);

fn settings(history_points: usize) -> Settings {
    Settings { throttle: false, history_points, ..Settings::default() }
}

/// FRED payload with one observation per day, newest first, ending
/// `age_days` ago.
fn observations(values: &[f64], age_days: i64) -> Value {
    let newest = Utc::now().date_naive() - ChronoDuration::days(age_days);
    let rows: Vec<Value> = values
        .iter()
        .rev()
        .enumerate()
        .map(|(i, v)| {
            let date = newest - ChronoDuration::days(i as i64);
            json!({ "date": date.format("%Y-%m-%d").to_string(), "value": v.to_string() })
        })
        .collect();
    json!({ "observations": rows })
}

async fn mount_fred_series(server: &MockServer, series_id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/fred/series/observations"))
        .and(query_param("series_id", series_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Registered last so specific mocks win.
async fn mount_catch_all_error(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

fn sources(server: &MockServer) -> HashMap<SourceType, Box<dyn DataSource>> {
    let mut sources: HashMap<SourceType, Box<dyn DataSource>> = HashMap::new();
    sources.insert(SourceType::Fred, Box::new(FredFetcher::new(KEY.into(), &server.uri(), TIMEOUT, 20)));
    sources.insert(SourceType::Multpl, Box::new(MultplFetcher::new(&server.uri(), TIMEOUT)));
    sources.insert(
        SourceType::PutCallPage,
        Box::new(PutCallFetcher::new(&format!("{}/put-call", server.uri()), TIMEOUT)),
    );
    sources
}

fn search(server: &MockServer) -> GroundedSearch {
    GroundedSearch::new("gemini-key".into(), "gemini-test", &server.uri(), TIMEOUT, Duration::from_secs(600))
}

#[tokio::test]
async fn every_source_failing_yields_fallback_table() {
    let server = MockServer::start().await;
    mount_catch_all_error(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let collector = Collector::new(
        Registry::catalog().unwrap(),
        sources(&server),
        Some(search(&server)),
        &settings(30),
        false,
    );
    let refresh = collector.refresh().await.unwrap();

    assert!(refresh.feed.all_fallback);
    assert_eq!(refresh.feed.fallback_ids.len(), 6);

    let values: Vec<(String, f64)> = refresh
        .data
        .indicators
        .iter()
        .map(|i| (i.spec.id.clone(), i.value))
        .collect();
    assert_eq!(
        values,
        vec![
            ("vix".to_string(), 16.2),
            ("yield-curve".to_string(), 0.2),
            ("hy-spread".to_string(), 3.5),
            ("pe-ratio".to_string(), 20.8),
            ("put-call".to_string(), 0.9),
            ("ted-spread".to_string(), 0.25),
        ]
    );

    // 25*.25 + 72*.15 + 29*.20 + 58*.20 + 57*.10 + 17*.10 = 41.85
    assert_eq!(refresh.data.total_score, 42);
    assert!(refresh.data.sources.is_empty());
    assert!(refresh.data.indicators.iter().all(|i| i.history.is_empty()));
}

#[tokio::test]
async fn live_and_search_tiers_fill_in_order() {
    let server = MockServer::start().await;
    mount_fred_series(&server, "T10Y2Y", observations(&[-0.1, -0.12, -0.2, -0.18, -0.15], 1)).await;
    mount_fred_series(&server, "BAMLH0A0HYM2", observations(&[3.4, 3.3, 3.25], 2)).await;
    mount_catch_all_error(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "VIX: 18.42\n**PE_RATIO:** 21.8\nPUT_CALL: 0.95\nTED: n/a" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://www.cboe.com/tradable_products/vix/", "title": "cboe.com" } },
                        { "web": { "uri": "https://fred.stlouisfed.org/series/T10Y2Y", "title": "duplicate" } }
                    ]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collector = Collector::new(
        Registry::catalog().unwrap(),
        sources(&server),
        Some(search(&server)),
        &settings(3),
        false,
    );
    let refresh = collector.refresh().await.unwrap();
    let data = &refresh.data;

    assert_eq!(refresh.feed.live, 2);
    assert_eq!(refresh.feed.search, 3);
    assert_eq!(refresh.feed.fallback_ids, vec!["ted-spread".to_string()]);
    assert!(!refresh.feed.all_fallback);

    let curve = data.indicator("yield-curve").unwrap();
    assert_eq!(curve.value, -0.15);
    assert_eq!(curve.sub_score, 86);
    assert_eq!(curve.provenance, Provenance::Live { source: "FRED T10Y2Y".into() });
    let trail: Vec<f64> = curve.history.iter().map(|h| h.value).collect();
    assert_eq!(trail, vec![-0.2, -0.18, -0.15]);

    let vix = data.indicator("vix").unwrap();
    assert_eq!(vix.value, 18.42);
    assert_eq!(vix.sub_score, 34);
    assert_eq!(vix.provenance, Provenance::Search);
    assert!(vix.history.is_empty());

    assert_eq!(data.indicator("ted-spread").unwrap().value, 0.25);

    // Live citations first, grounding chunk duplicates dropped
    let uris: Vec<&str> = data.sources.iter().map(|s| s.uri.as_str()).collect();
    assert_eq!(
        uris,
        vec![
            "https://fred.stlouisfed.org/series/T10Y2Y",
            "https://fred.stlouisfed.org/series/BAMLH0A0HYM2",
            "https://www.cboe.com/tradable_products/vix/",
        ]
    );
}

#[tokio::test]
async fn stale_primary_falls_through_to_calculated_secondary() {
    let server = MockServer::start().await;
    mount_fred_series(&server, "T10Y2Y", observations(&[0.5, 0.6], 120)).await;
    mount_fred_series(&server, "DGS10", observations(&[4.3, 4.25, 4.2], 1)).await;
    mount_fred_series(&server, "DGS2", observations(&[4.0, 3.95], 1)).await;
    mount_catch_all_error(&server).await;

    let collector = Collector::new(Registry::catalog().unwrap(), sources(&server), None, &settings(30), false);
    let refresh = collector.refresh().await.unwrap();

    let curve = refresh.data.indicator("yield-curve").unwrap();
    assert_eq!(
        curve.provenance,
        Provenance::Secondary { source: "Calculated yield_curve_10y_2y".into() }
    );
    assert!((curve.value - 0.25).abs() < 1e-9);
    assert_eq!(refresh.feed.secondary, 1);

    let uris: Vec<&str> = refresh.data.sources.iter().map(|s| s.uri.as_str()).collect();
    assert!(uris.contains(&"https://fred.stlouisfed.org/series/DGS10"));
    assert!(uris.contains(&"https://fred.stlouisfed.org/series/DGS2"));
}

#[tokio::test]
async fn offline_mode_never_touches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let collector = Collector::new(Registry::catalog().unwrap(), sources(&server), Some(search(&server)), &settings(30), true);
    let refresh = collector.refresh().await.unwrap();
    assert!(refresh.feed.all_fallback);
}

#[tokio::test]
async fn stale_put_call_page_falls_back() {
    let server = MockServer::start().await;
    let old = (Utc::now() - ChronoDuration::days(90)).format("%Y-%m-%d").to_string();
    let page = format!(
        r#"<time datetime="{}"></time><table><tr><td>EQUITY PUT/CALL RATIO</td><td>0.55</td></tr></table>"#,
        old
    );
    Mock::given(method("GET"))
        .and(path("/put-call"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;
    mount_catch_all_error(&server).await;

    let collector = Collector::new(Registry::catalog().unwrap(), sources(&server), None, &settings(30), false);
    let refresh = collector.refresh().await.unwrap();

    let put_call = refresh.data.indicator("put-call").unwrap();
    assert_eq!(put_call.provenance, Provenance::Fallback);
    assert_eq!(put_call.value, 0.9);
}
