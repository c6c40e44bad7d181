//! Batch pose estimation configuration

use serde::Deserialize;
use std::path::PathBuf;

use crate::engine::ModelKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// OpenVINO device the network runs on ("CPU", "GPU", ...)
    pub device: String,
    /// Maximum number of images in flight at once
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub path: PathBuf,
    /// Keypoints scoring below this are reported with a score of zero
    pub min_keypoint_score: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub pretty: bool,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> &'static str {
        "posebatch.toml"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inference: InferenceConfig::default(),
            model: ModelConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: "CPU".to_string(),
            workers: 1,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::PoseNet,
            path: PathBuf::from("models/posenet_mobilenet_v1_075.xml"),
            min_keypoint_score: 0.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output.json"),
            pretty: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.inference.device, "CPU");
        assert_eq!(config.inference.workers, 1);
        assert_eq!(config.model.kind, ModelKind::PoseNet);
        assert_eq!(config.output.path, PathBuf::from("output.json"));
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let config: Config = toml::from_str(
            r#"
            [inference]
            device = "GPU"
            workers = 2

            [model]
            kind = "movenet"
            path = "models/movenet.xml"
            min_keypoint_score = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(config.inference.device, "GPU");
        assert_eq!(config.inference.workers, 2);
        assert_eq!(config.model.kind, ModelKind::MoveNet);
        assert_eq!(config.model.min_keypoint_score, 0.2);
        assert_eq!(config.output.path, PathBuf::from("output.json"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load("does/not/exist.toml").is_err());
    }
}
