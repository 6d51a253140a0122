use hotspot_report::config::AppConfig;
use hotspot_report::{generate_report, output};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotspot_report=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config).await {
        tracing::error!("Report generation failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let report = generate_report(config).await?;
    let summary = output::emit_summary(&report.hotspots, config.hotspots_json.as_deref())?;
    println!("{}", summary);
    Ok(())
}
