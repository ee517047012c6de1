use market_risk_lib::{config::Settings, core::orchestrator::Collector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    println!(
        "🔍 Source diagnostic (FRED key: {}, Gemini key: {})",
        if settings.fred_api_key.is_some() { "set" } else { "missing" },
        if settings.gemini_api_key.is_some() { "set" } else { "missing" },
    );

    let collector = Collector::from_settings(&settings, false)?;
    let statuses = collector.probe_sources().await;

    println!("\n{:<12} | {:<34} | {:<8} | {:<12} | {}", "Indicator", "Source", "Status", "Observed", "Value / Error");
    println!("{}", "-".repeat(100));

    let mut failures = 0;
    for s in &statuses {
        match (s.value, s.observed_at, &s.error) {
            (Some(value), Some(ts), _) => {
                println!("{:<12} | {:<34} | {:<8} | {:<12} | {:.4}", s.indicator, s.source, "OK", ts.date_naive().to_string(), value);
            }
            (_, _, error) => {
                failures += 1;
                let reason = error.as_deref().unwrap_or("unknown");
                println!("{:<12} | {:<34} | {:<8} | {:<12} | {}", s.indicator, s.source, "FAIL", "-", reason);
            }
        }
    }

    println!("\n{} of {} sources reachable.", statuses.len() - failures, statuses.len());
    Ok(())
}
