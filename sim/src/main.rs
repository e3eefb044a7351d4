//! Gridsync Sim - runs concurrent editing sessions and checks that they
//! converge on the same report table.

use gridsync_sim::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridsync_sim=info,gridsync_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(?config, "Starting simulation");

    let report = gridsync_sim::run(&config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.converged {
        std::process::exit(1);
    }
    Ok(())
}
