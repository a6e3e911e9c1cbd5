mod capture_date;
mod config;
mod destination;
mod error;
mod ffmpeg;
mod ingest;
mod media;
mod placement;
mod thumbnail;
mod walker;
mod web_server;

use crate::config::AppConfig;
use anyhow::Result;
use clap::Parser;
use log::info;

/// Personal file storage with automatic photo/video organization.
#[derive(Parser)]
#[command(name = "media_vault")]
struct Args {
    /// Override the configured web port
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::new()?;
    if let Some(port) = args.port {
        config.web_port = port;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting media_vault");

    std::fs::create_dir_all(&config.storage_root)?;
    std::fs::create_dir_all(&config.thumbnail_cache_dir)?;

    if let Err(e) = web_server::start_web_server(config).await {
        log::error!("Web server error: {}", e);
    }

    info!("media_vault finished");

    Ok(())
}
