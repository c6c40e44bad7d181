//! Result serialization

use std::io::Write;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::pose::PoseResult;

/// Serialize the whole collection and replace `path` with it
///
/// The JSON goes to a temporary file in the same directory first, so the
/// target is either left untouched or fully overwritten.
pub fn write_output(path: &Path, results: &[PoseResult], pretty: bool) -> PipelineResult<()> {
    let json = if pretty {
        serde_json::to_vec_pretty(results)?
    } else {
        serde_json::to_vec(results)?
    };

    let write_err = |source: std::io::Error| PipelineError::WriteOutput {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(&json).map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}
