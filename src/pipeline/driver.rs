//! Inference driver
//!
//! Feeds decoded images through one estimator on the blocking thread pool.
//! At most `workers` images are in flight; results are stored by input
//! index so the output order never depends on completion order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::debug;

use crate::engine::PoseEstimator;
use crate::error::{PipelineError, PipelineResult};
use crate::pose::PoseResult;

use super::loader::LoadedImage;

type JobOutput = (usize, PathBuf, anyhow::Result<PoseResult>);

/// Estimate poses for every image, preserving input order
///
/// A failure stops new jobs from starting. Jobs already in flight are drained
/// and the failure with the lowest input index is reported, so the error does
/// not depend on completion order.
pub async fn run_inference(
    estimator: Arc<dyn PoseEstimator>,
    images: Vec<LoadedImage>,
    workers: usize,
) -> PipelineResult<Vec<PoseResult>> {
    let total = images.len();
    let workers = workers.max(1);

    let mut slots: Vec<Option<PoseResult>> = vec![None; total];
    let mut pending = images.into_iter().enumerate();
    let mut tasks: JoinSet<JobOutput> = JoinSet::new();
    let mut failure: Option<(usize, PipelineError)> = None;

    loop {
        while failure.is_none() && tasks.len() < workers {
            let Some((index, loaded)) = pending.next() else {
                break;
            };
            let estimator = estimator.clone();
            tasks.spawn_blocking(move || {
                let start = Instant::now();
                let result = estimator.estimate_poses(&loaded.image);
                debug!("{} processed in {:?}", loaded.path.display(), start.elapsed());
                (index, loaded.path, result)
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };

        let (index, path, result) = joined?;
        match result {
            Ok(poses) => slots[index] = Some(poses),
            Err(source) => {
                if failure.as_ref().map_or(true, |(failed, _)| index < *failed) {
                    failure = Some((index, PipelineError::Inference { path, source }));
                }
            }
        }
    }

    match failure {
        Some((_, err)) => Err(err),
        None => Ok(slots.into_iter().flatten().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb};

    use crate::pose::{Keypoint, KeypointName, Pose};

    /// Reports the image width as the nose x coordinate
    struct WidthEstimator {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl WidthEstimator {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    impl PoseEstimator for WidthEstimator {
        fn estimate_poses(&self, image: &DynamicImage) -> anyhow::Result<PoseResult> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            // Narrow images finish last so completion order is reversed
            let width = image.width();
            std::thread::sleep(Duration::from_millis(60u64.saturating_sub(width as u64 * 10)));

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if width == 0 {
                anyhow::bail!("zero width");
            }
            Ok(vec![Pose::from_keypoints(vec![Keypoint::new(
                KeypointName::Nose,
                width as f32,
                0.0,
                0.9,
            )])])
        }
    }

    fn images(widths: &[u32]) -> Vec<LoadedImage> {
        widths
            .iter()
            .map(|&w| LoadedImage {
                path: PathBuf::from(format!("img_{w}.png")),
                image: DynamicImage::ImageRgb8(ImageBuffer::from_pixel(w, 1, Rgb([0u8, 0, 0]))),
            })
            .collect()
    }

    fn nose_xs(results: &[PoseResult]) -> Vec<f32> {
        results.iter().map(|r| r[0].keypoints[0].x).collect()
    }

    #[tokio::test]
    async fn test_sequential_keeps_order() {
        let estimator = Arc::new(WidthEstimator::new());
        let results = run_inference(estimator.clone(), images(&[1, 2, 3]), 1)
            .await
            .unwrap();

        assert_eq!(nose_xs(&results), vec![1.0, 2.0, 3.0]);
        assert_eq!(estimator.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parallel_keeps_input_order() {
        let estimator = Arc::new(WidthEstimator::new());
        let results = run_inference(estimator.clone(), images(&[1, 2, 3, 4, 5]), 3)
            .await
            .unwrap();

        assert_eq!(nose_xs(&results), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(estimator.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results = run_inference(Arc::new(WidthEstimator::new()), vec![], 4)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_first_failure_names_the_file() {
        let err = run_inference(Arc::new(WidthEstimator::new()), images(&[2, 0, 3]), 1)
            .await
            .unwrap_err();

        match err {
            PipelineError::Inference { path, .. } => assert_eq!(path, PathBuf::from("img_0.png")),
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Fails every image; wider images fail sooner
    struct FailingEstimator;

    impl PoseEstimator for FailingEstimator {
        fn estimate_poses(&self, image: &DynamicImage) -> anyhow::Result<PoseResult> {
            std::thread::sleep(Duration::from_millis(100 - image.width() as u64 * 20));
            anyhow::bail!("width {}", image.width())
        }
    }

    #[tokio::test]
    async fn test_parallel_failure_reports_lowest_index() {
        let err = run_inference(Arc::new(FailingEstimator), images(&[1, 2, 3]), 3)
            .await
            .unwrap_err();

        match err {
            PipelineError::Inference { path, .. } => assert_eq!(path, PathBuf::from("img_1.png")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
