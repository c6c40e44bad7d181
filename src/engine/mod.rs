//! Inference engine module
//!
//! Provides OpenVINO-based pose estimation with:
//! - Lazy runtime and model loading
//! - Letterbox preprocessing with EXIF orientation
//! - PoseNet and MoveNet output decoding

pub mod pool;
pub mod detector;
pub mod decode;
pub mod preprocess;

pub use pool::ModelPool;
pub use detector::{create_detector, ModelKind, PoseDetector, PoseEstimator};
