//! OnTap tap dashboard service - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

use ontap_bot::{AppConfig, Application};

/// OnTap tap dashboard service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via ONTAP_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Location id or slug to show (overrides the config file)
    #[arg(short, long)]
    location: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Determine config path: CLI arg > ONTAP_CONFIG env var > default
    let config_path = args.config.or_else(|| std::env::var("ONTAP_CONFIG").ok());

    // Load configuration before logging so the configured level applies
    let mut config = AppConfig::load(config_path.as_deref())?.with_env_overrides();
    if let Some(location) = args.location {
        config.location = location;
    }

    ontap_telemetry::init_logging(config.telemetry.log_level.as_deref())?;

    info!("Starting OnTap v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = config_path.as_deref().unwrap_or(ontap_bot::config::DEFAULT_CONFIG_PATH),
        api_url = %config.api_url,
        location = %config.location,
        dashboard_port = config.dashboard.port,
        "Configuration loaded"
    );

    let app = Application::new(config)?;
    app.run().await?;

    Ok(())
}
