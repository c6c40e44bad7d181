//! Model output decoding
//!
//! Turns raw output buffers into keypoints in original image pixels.
//! Kept free of runtime types so it can be tested on plain slices.

use anyhow::{bail, Result};

use crate::pose::{Keypoint, KeypointName, Pose, NUM_KEYPOINTS};
use crate::utils::math::{argmax_strided, sigmoid};

use super::preprocess::ResizeInfo;

/// PoseNet MobileNetV1 output stride
pub const POSENET_OUTPUT_STRIDE: u32 = 16;

/// Heatmap grid geometry for a PoseNet output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapGrid {
    pub height: usize,
    pub width: usize,
    pub output_stride: u32,
}

/// Decode a single pose from PoseNet heatmap logits and offsets (both NHWC)
///
/// `heatmaps` is `[1, H, W, 17]`, `offsets` is `[1, H, W, 34]` with the y
/// offsets in the first 17 channels and x offsets in the last 17.
pub fn decode_posenet(
    heatmaps: &[f32],
    offsets: &[f32],
    grid: HeatmapGrid,
    resize_info: &ResizeInfo,
    min_score: f32,
) -> Result<Pose> {
    let cells = grid.height * grid.width;
    if cells == 0 {
        bail!("empty heatmap grid {}x{}", grid.height, grid.width);
    }
    if heatmaps.len() != cells * NUM_KEYPOINTS {
        bail!(
            "unexpected heatmap size: got {}, expected {}",
            heatmaps.len(),
            cells * NUM_KEYPOINTS
        );
    }
    if offsets.len() != cells * NUM_KEYPOINTS * 2 {
        bail!(
            "unexpected offsets size: got {}, expected {}",
            offsets.len(),
            cells * NUM_KEYPOINTS * 2
        );
    }

    let stride = grid.output_stride as f32;
    let mut keypoints = Vec::with_capacity(NUM_KEYPOINTS);

    for (k, name) in KeypointName::ALL.iter().enumerate() {
        let cell = argmax_strided(heatmaps, k, NUM_KEYPOINTS);
        let (cy, cx) = (cell / grid.width, cell % grid.width);
        let score = sigmoid(heatmaps[cell * NUM_KEYPOINTS + k]);

        let offset_base = cell * NUM_KEYPOINTS * 2;
        let y = cy as f32 * stride + offsets[offset_base + k];
        let x = cx as f32 * stride + offsets[offset_base + NUM_KEYPOINTS + k];

        keypoints.push(to_original_keypoint(*name, x, y, score, resize_info, min_score));
    }

    Ok(Pose::from_keypoints(keypoints))
}

/// Decode a single pose from a MoveNet `[1, 1, 17, 3]` output
///
/// Each row is `(y, x, score)` normalized to the model input square.
pub fn decode_movenet(
    output: &[f32],
    input_size: (u32, u32),
    resize_info: &ResizeInfo,
    min_score: f32,
) -> Result<Pose> {
    if output.len() < NUM_KEYPOINTS * 3 {
        bail!(
            "unexpected MoveNet output size: got {}, expected {}",
            output.len(),
            NUM_KEYPOINTS * 3
        );
    }

    let (input_w, input_h) = (input_size.0 as f32, input_size.1 as f32);
    let keypoints = KeypointName::ALL
        .iter()
        .zip(output.chunks_exact(3))
        .map(|(name, row)| {
            let (y, x, score) = (row[0] * input_h, row[1] * input_w, row[2]);
            to_original_keypoint(*name, x, y, score, resize_info, min_score)
        })
        .collect();

    Ok(Pose::from_keypoints(keypoints))
}

fn to_original_keypoint(
    name: KeypointName,
    x: f32,
    y: f32,
    score: f32,
    resize_info: &ResizeInfo,
    min_score: f32,
) -> Keypoint {
    let (x, y) = resize_info.to_original(x, y);

    // Clamp to image bounds
    let x = x.clamp(0.0, resize_info.original_width as f32);
    let y = y.clamp(0.0, resize_info.original_height as f32);

    let score = if score < min_score { 0.0 } else { score };
    Keypoint::new(name, x, y, score)
}
