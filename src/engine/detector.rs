//! Single-person pose detector
//!
//! Runs PoseNet or MoveNet through OpenVINO and decodes the outputs into
//! 17 COCO keypoints.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use image::DynamicImage;
use ndarray::Array4;
use openvino::{ElementType, InferRequest, Shape, Tensor};
use serde::Deserialize;

use crate::pose::{PoseResult, NUM_KEYPOINTS};

use super::decode::{decode_movenet, decode_posenet, HeatmapGrid, POSENET_OUTPUT_STRIDE};
use super::pool::ModelPool;
use super::preprocess::{preprocess_for_movenet, preprocess_for_posenet, MOVENET_INPUT_SIZE};

/// Supported pose models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// PoseNet MobileNetV1, single pose
    #[value(name = "posenet")]
    PoseNet,
    /// MoveNet SinglePose
    #[value(name = "movenet")]
    MoveNet,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::PoseNet => "posenet",
            ModelKind::MoveNet => "movenet",
        }
    }
}

/// Anything that turns an image into poses
///
/// Implementations must be callable from several blocking threads at once.
pub trait PoseEstimator: Send + Sync + 'static {
    fn estimate_poses(&self, image: &DynamicImage) -> Result<PoseResult>;
}

/// OpenVINO-backed pose detector
pub struct PoseDetector {
    pool: Arc<ModelPool>,
    kind: ModelKind,
    min_keypoint_score: f32,
}

/// Create the detector for a model kind
pub fn create_detector(kind: ModelKind, pool: Arc<ModelPool>, min_keypoint_score: f32) -> PoseDetector {
    PoseDetector::new(pool, kind, min_keypoint_score)
}

impl PoseDetector {
    pub fn new(pool: Arc<ModelPool>, kind: ModelKind, min_keypoint_score: f32) -> Self {
        Self {
            pool,
            kind,
            min_keypoint_score,
        }
    }

    fn detect_posenet(&self, image: &DynamicImage) -> Result<PoseResult> {
        let (input, resize_info) = preprocess_for_posenet(image);
        let request = self.infer(&input)?;

        let heatmap_tensor = request.get_output_tensor_by_index(0)?;
        let offsets_tensor = request.get_output_tensor_by_index(1)?;

        let grid = heatmap_grid(heatmap_tensor.get_shape()?.get_dimensions())?;

        let heatmaps = read_tensor_f32(&heatmap_tensor)?;
        let offsets = read_tensor_f32(&offsets_tensor)?;

        let pose = decode_posenet(&heatmaps, &offsets, grid, &resize_info, self.min_keypoint_score)?;
        Ok(vec![pose])
    }

    fn detect_movenet(&self, image: &DynamicImage) -> Result<PoseResult> {
        let (input, resize_info) = preprocess_for_movenet(image);
        let request = self.infer(&input)?;

        let output = read_tensor_f32(&request.get_output_tensor_by_index(0)?)?;
        let pose = decode_movenet(&output, MOVENET_INPUT_SIZE, &resize_info, self.min_keypoint_score)?;
        Ok(vec![pose])
    }

    /// Run the compiled model on an NHWC input and hand back the finished request
    fn infer(&self, input_tensor: &Array4<f32>) -> Result<InferRequest> {
        let model = self.pool.get_model()?;
        let mut request = model.create_infer_request()?;

        let dims: Vec<i64> = input_tensor.shape().iter().map(|&d| d as i64).collect();
        let input_shape = Shape::new(&dims)?;
        let mut input = Tensor::new(ElementType::F32, &input_shape)?;

        let input_data = input_tensor
            .as_slice()
            .context("input tensor is not contiguous")?;
        unsafe {
            let tensor_data = input.get_raw_data_mut()?.as_mut_ptr() as *mut f32;
            std::ptr::copy_nonoverlapping(input_data.as_ptr(), tensor_data, input_data.len());
        }

        request.set_input_tensor(&input)?;
        request.infer()?;
        Ok(request)
    }
}

impl PoseEstimator for PoseDetector {
    fn estimate_poses(&self, image: &DynamicImage) -> Result<PoseResult> {
        let start = Instant::now();
        let poses = match self.kind {
            ModelKind::PoseNet => self.detect_posenet(image),
            ModelKind::MoveNet => self.detect_movenet(image),
        }?;
        tracing::debug!("{} inference took {:?}", self.kind.as_str(), start.elapsed());
        Ok(poses)
    }
}

/// Heatmap grid from an NHWC `[1, H, W, 17]` output shape
fn heatmap_grid(dims: &[i64]) -> Result<HeatmapGrid> {
    let positive = |d: i64| usize::try_from(d).ok().filter(|&d| d > 0);
    let &[_, h, w, k] = dims else {
        bail!("unexpected PoseNet heatmap shape: {:?}", dims);
    };
    match (positive(h), positive(w), positive(k)) {
        (Some(height), Some(width), Some(NUM_KEYPOINTS)) => Ok(HeatmapGrid {
            height,
            width,
            output_stride: POSENET_OUTPUT_STRIDE,
        }),
        _ => bail!("unexpected PoseNet heatmap shape: {:?}", dims),
    }
}

/// Read tensor data as f32 vector
fn read_tensor_f32(tensor: &Tensor) -> Result<Vec<f32>> {
    let shape = tensor.get_shape()?;
    let total_elements: i64 = shape.get_dimensions().iter().product();
    let total_elements = usize::try_from(total_elements)
        .with_context(|| format!("dynamic output shape {:?}", shape.get_dimensions()))?;

    let data: Vec<f32> = unsafe {
        let ptr = tensor.get_raw_data()?.as_ptr() as *const f32;
        std::slice::from_raw_parts(ptr, total_elements).to_vec()
    };

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceConfig;

    #[test]
    fn test_model_kind_names() {
        assert_eq!(ModelKind::PoseNet.as_str(), "posenet");
        assert_eq!(ModelKind::MoveNet.as_str(), "movenet");

        let kind: ModelKind = serde_json::from_str(r#""movenet""#).unwrap();
        assert_eq!(kind, ModelKind::MoveNet);
    }

    #[test]
    fn test_create_detector_does_not_load_model() {
        let pool = Arc::new(ModelPool::new(&InferenceConfig::default(), "models/missing.xml"));
        let detector = create_detector(ModelKind::MoveNet, pool.clone(), 0.0);

        assert_eq!(detector.kind, ModelKind::MoveNet);
        assert!(!pool.is_loaded());
    }

    #[test]
    fn test_heatmap_grid_from_shape() {
        let grid = heatmap_grid(&[1, 17, 9, 17]).unwrap();
        assert_eq!((grid.height, grid.width), (17, 9));
        assert_eq!(grid.output_stride, POSENET_OUTPUT_STRIDE);
    }

    #[test]
    fn test_heatmap_grid_rejects_dynamic_or_bad_dims() {
        assert!(heatmap_grid(&[1, -1, 17, 17]).is_err());
        assert!(heatmap_grid(&[1, 17, 0, 17]).is_err());
        assert!(heatmap_grid(&[1, 17, 17, 34]).is_err());
        assert!(heatmap_grid(&[17, 17, 17]).is_err());
    }
}
