// src/main.rs

mod annotate;
mod classifier;
mod config;
mod density;
mod error;
mod frame_pipeline;
mod region;
mod server;
mod telegram;
mod types;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use types::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "parkwatch=info,warp=warn".to_string()),
        )
        .init();

    info!("🅿️  Parking Occupancy Service Starting");

    let config_path =
        std::env::var("PARKWATCH_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let cfg = Config::load(&config_path)?;
    info!("✓ Configuration loaded from {}", config_path);

    let regions = config::build_regions(&cfg.regions);
    config::validate(&cfg, &regions)?;
    info!(
        "✓ {} region(s) validated against the {}x{} canvas",
        regions.len(),
        cfg.transform.crop.width,
        cfg.transform.crop.height
    );
    info!(
        "Threshold profiles: {:?}, default '{}'",
        cfg.thresholds.profiles, cfg.thresholds.default_profile
    );

    let telegram = telegram::TelegramClient::new(30)?;

    let state = Arc::new(server::AppState {
        config: cfg,
        regions,
        telegram,
    });

    server::run(state).await
}
