//! Batch pose estimation library

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod pose;
pub mod utils;

pub use config::Config;
pub use error::{PipelineError, PipelineResult};
