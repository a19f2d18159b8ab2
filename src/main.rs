use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qweather_mcp::cli::Cli;
use qweather_mcp::config::Config;
use qweather_mcp::Weather;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qweather_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting QWeather MCP server");

    let config = Config::from_env()?;
    tracing::info!("API host: {}", config.base_url);

    let weather = Weather::new(&config)?;
    cli.run(weather).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
