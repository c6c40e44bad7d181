//! posebatch
//!
//! Runs a pose model over every image in a directory and writes the
//! keypoints to a single JSON file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use posebatch::cli::Cli;
use posebatch::config::Config;
use posebatch::engine::{create_detector, ModelPool};
use posebatch::pipeline::run_batch;

#[tokio::main]
async fn main() {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    if let Err(err) = run().await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            Config::load(&path).with_context(|| format!("failed to load config {}", path))?
        }
        None => {
            let path = Config::default_path();
            if Path::new(path).exists() {
                Config::load(path).with_context(|| format!("failed to load config {}", path))?
            } else {
                info!("No {} found, using default config", path);
                Config::default()
            }
        }
    };
    cli.apply(&mut config);

    let pool = Arc::new(ModelPool::new(&config.inference, config.model.path.clone()));

    info!("posebatch v{}", env!("CARGO_PKG_VERSION"));
    info!("  Model: {} ({})", config.model.kind.as_str(), pool.model_path().display());
    info!("  Device: {}", pool.device());
    info!("  Workers: {}", config.inference.workers);

    let detector = create_detector(config.model.kind, pool, config.model.min_keypoint_score);

    let options = cli.batch_options(&config);
    let summary = run_batch(&options, Arc::new(detector)).await.map_err(|e| {
        error!("{} stage failed", e.stage());
        e
    })?;

    info!(
        "Wrote {} results ({} poses) to {} in {:?}",
        summary.images,
        summary.poses,
        summary.output_path.display(),
        summary.elapsed
    );
    Ok(())
}
