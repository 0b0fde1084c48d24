// src/main.rs

mod accumulator;
mod clustering;
mod config;
mod display;
mod event_log;
mod pipeline;
mod tracking;
mod types;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::Config;

const CONFIG_ENV: &str = "RADVISION_CONFIG";
const DEFAULT_CONFIG: &str = "config.yaml";

fn main() -> Result<()> {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = Config::load_or_default(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🎯 Radvision marker tracker starting");
    if Path::new(&config_path).exists() {
        info!("✓ Configuration loaded from {}", config_path);
    } else {
        warn!("⚠️  Config {} not found, using defaults", config_path);
    }

    let input = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&config.input.path));
    info!("📂 Input event log: {}", input.display());

    let summary = pipeline::run(&config, &input)?;

    info!("\n========================================");
    info!("  Windows processed: {}", summary.windows_processed);
    info!("  Windows with markers: {}", summary.windows_with_detections);
    info!("  Entities created: {}", summary.entities_created);
    info!("  Entities evicted: {}", summary.entities_evicted);
    info!("  Rows written: {}", summary.rows_written);
    if summary.out_of_bounds_events > 0 {
        info!("  ⚠️  Out-of-bounds events: {}", summary.out_of_bounds_events);
    }
    info!("========================================");

    Ok(())
}
