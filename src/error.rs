//! Pipeline error types
//!
//! Every variant names the stage that failed and the path it was working on.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to list directory {}", path.display())]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("inference failed for {}", path.display())]
    Inference {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("worker task failed")]
    Task(#[from] tokio::task::JoinError),

    #[error("failed to serialize results")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Short stage label used in log lines
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::ListDirectory { .. } => "list",
            PipelineError::ReadFile { .. } | PipelineError::Decode { .. } => "load",
            PipelineError::Inference { .. } | PipelineError::Task(_) => "inference",
            PipelineError::Serialize(_) | PipelineError::WriteOutput { .. } => "output",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        let err = PipelineError::ReadFile {
            path: PathBuf::from("imgs/a.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "failed to read imgs/a.png");
        assert_eq!(err.stage(), "load");

        let err = PipelineError::Inference {
            path: PathBuf::from("imgs/b.png"),
            source: anyhow::anyhow!("bad tensor"),
        };
        assert_eq!(err.to_string(), "inference failed for imgs/b.png");
        assert_eq!(err.stage(), "inference");
    }
}
