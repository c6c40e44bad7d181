//! Directory listing

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

/// List every entry directly under `dir`
///
/// Entries come back in the order the filesystem yields them unless `sort`
/// is set, in which case they are ordered by file name. Nothing is filtered.
pub fn list_entries(dir: &Path, sort: bool) -> PipelineResult<Vec<PathBuf>> {
    let list_err = |source: std::io::Error| PipelineError::ListDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = std::fs::read_dir(dir)
        .map_err(list_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(list_err)?;

    if sort {
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    Ok(entries)
}
