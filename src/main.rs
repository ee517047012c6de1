use clap::Parser;
use market_risk_lib::cli::Args;
use tracing::error;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    market_risk_lib::init_logging(&args);

    if let Err(e) = market_risk_lib::run(args).await {
        error!("{:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}
