//! Batch pipeline
//!
//! list -> load all -> estimate all -> write once. Any stage failure stops
//! the run before the output file is touched.

pub mod lister;
pub mod loader;
pub mod driver;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::engine::PoseEstimator;
use crate::error::PipelineResult;

pub use driver::run_inference;
pub use lister::list_entries;
pub use loader::{load_all, load_image, LoadedImage};
pub use output::write_output;

/// Settings for one batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub sort: bool,
    pub workers: usize,
    pub pretty: bool,
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub images: usize,
    pub poses: usize,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

/// Run the whole pipeline with the given estimator
pub async fn run_batch(
    options: &BatchOptions,
    estimator: Arc<dyn PoseEstimator>,
) -> PipelineResult<BatchSummary> {
    let start = Instant::now();

    let input_dir = options.input_dir.clone();
    let sort = options.sort;
    let images = tokio::task::spawn_blocking(move || {
        let paths = list_entries(&input_dir, sort)?;
        info!("Found {} entries in {}", paths.len(), input_dir.display());
        load_all(&paths)
    })
    .await??;

    let image_count = images.len();
    let results = run_inference(estimator, images, options.workers).await?;
    let poses = results.iter().map(Vec::len).sum();

    write_output(&options.output_path, &results, options.pretty)?;

    Ok(BatchSummary {
        images: image_count,
        poses,
        output_path: options.output_path.clone(),
        elapsed: start.elapsed(),
    })
}
