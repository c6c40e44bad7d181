//! Image loading

use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::info;

use crate::engine::preprocess::decode_image;
use crate::error::{PipelineError, PipelineResult};

/// A decoded image and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub image: DynamicImage,
}

/// Read a whole file and decode it
pub fn load_image(path: &Path) -> PipelineResult<DynamicImage> {
    info!("load path: {}", path.display());

    let bytes = std::fs::read(path).map_err(|source| PipelineError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    decode_image(&bytes).map_err(|source| PipelineError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every path up front, stopping at the first failure
pub fn load_all(paths: &[PathBuf]) -> PipelineResult<Vec<LoadedImage>> {
    paths
        .iter()
        .map(|path| {
            load_image(path).map(|image| LoadedImage {
                path: path.clone(),
                image,
            })
        })
        .collect()
}
