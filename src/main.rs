use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod analysis;
mod config;
mod dataset;
mod extract;
mod pipeline;
mod qa;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    std::fs::create_dir_all(&config.outdir)
        .with_context(|| format!("Failed to create output directory {}", config.outdir.display()))?;
    info!("Output directory: {}", config.outdir.display());
    if config.window().is_bounded() {
        info!(
            "Season window: {} .. {}",
            config
                .season_start
                .map_or_else(|| "open".to_string(), |d| d.to_string()),
            config
                .season_end
                .map_or_else(|| "open".to_string(), |d| d.to_string())
        );
    }

    pipeline::dispatch(&config).await
}
