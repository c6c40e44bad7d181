//! Command line interface

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::engine::ModelKind;
use crate::pipeline::BatchOptions;

#[derive(Parser, Debug)]
#[command(name = "posebatch", version, about = "Estimate poses for every image in a directory")]
pub struct Cli {
    /// Directory whose entries are all treated as images
    pub input_dir: PathBuf,
    #[arg(long, help = "Config file (defaults to posebatch.toml when present)")]
    pub config: Option<PathBuf>,
    #[arg(long, short, help = "Output JSON file")]
    pub output: Option<PathBuf>,
    #[arg(long, help = "OpenVINO device, e.g. CPU or GPU")]
    pub device: Option<String>,
    #[arg(long, help = "Model file (OpenVINO IR or ONNX)")]
    pub model: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub kind: Option<ModelKind>,
    #[arg(long, help = "Images processed concurrently")]
    pub workers: Option<usize>,
    #[arg(long, default_value_t = false, help = "Process entries in file name order")]
    pub sort: bool,
    #[arg(long, default_value_t = false, help = "Indent the output JSON")]
    pub pretty: bool,
}

impl Cli {
    /// Overlay command line flags onto a loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(device) = &self.device {
            config.inference.device = device.clone();
        }
        if let Some(model) = &self.model {
            config.model.path = model.clone();
        }
        if let Some(kind) = self.kind {
            config.model.kind = kind;
        }
        if let Some(workers) = self.workers {
            config.inference.workers = workers;
        }
        if self.pretty {
            config.output.pretty = true;
        }
    }

    pub fn batch_options(&self, config: &Config) -> BatchOptions {
        BatchOptions {
            input_dir: self.input_dir.clone(),
            output_path: config.output.path.clone(),
            sort: self.sort,
            workers: config.inference.workers,
            pretty: config.output.pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_only() {
        let cli = Cli::try_parse_from(["posebatch", "frames"]).unwrap();
        assert_eq!(cli.input_dir, PathBuf::from("frames"));
        assert!(!cli.sort);

        let mut config = Config::default();
        cli.apply(&mut config);
        let options = cli.batch_options(&config);
        assert_eq!(options.output_path, PathBuf::from("output.json"));
        assert_eq!(options.workers, 1);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "posebatch", "frames", "--kind", "movenet", "--device", "GPU", "--workers", "4",
            "-o", "poses.json", "--sort", "--pretty",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.model.kind, ModelKind::MoveNet);
        assert_eq!(config.inference.device, "GPU");
        assert_eq!(config.inference.workers, 4);
        assert!(config.output.pretty);

        let options = cli.batch_options(&config);
        assert_eq!(options.output_path, PathBuf::from("poses.json"));
        assert!(options.sort);
    }

    #[test]
    fn test_missing_directory_argument() {
        assert!(Cli::try_parse_from(["posebatch"]).is_err());
    }
}
