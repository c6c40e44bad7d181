//! Image preprocessing for pose models

use image::{DynamicImage, GenericImageView, ImageBuffer, ImageResult, Rgb};
use ndarray::Array4;

/// Input size for PoseNet MobileNetV1 at output stride 16
pub const POSENET_INPUT_SIZE: (u32, u32) = (257, 257);

/// Input size for MoveNet SinglePose Lightning
pub const MOVENET_INPUT_SIZE: (u32, u32) = (192, 192);

/// Pixel value mapping applied when building an input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelScale {
    /// v / 127.5 - 1, range [-1, 1]
    Symmetric,
    /// Raw value, range [0, 255]
    Raw,
}

/// Letterbox an image into a PoseNet input tensor (NHWC)
pub fn preprocess_for_posenet(image: &DynamicImage) -> (Array4<f32>, ResizeInfo) {
    letterbox_to_nhwc(image, POSENET_INPUT_SIZE, PixelScale::Symmetric)
}

/// Letterbox an image into a MoveNet input tensor (NHWC)
pub fn preprocess_for_movenet(image: &DynamicImage) -> (Array4<f32>, ResizeInfo) {
    letterbox_to_nhwc(image, MOVENET_INPUT_SIZE, PixelScale::Raw)
}

fn letterbox_to_nhwc(
    image: &DynamicImage,
    target: (u32, u32),
    scale: PixelScale,
) -> (Array4<f32>, ResizeInfo) {
    let resize_info = ResizeInfo::new(image.dimensions(), target);
    let padded = resize_with_padding(image, &resize_info, target);
    (image_to_nhwc(&padded, scale), resize_info)
}

/// Resize image with padding to maintain aspect ratio
fn resize_with_padding(
    image: &DynamicImage,
    info: &ResizeInfo,
    (target_w, target_h): (u32, u32),
) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let resized = image
        .resize_exact(info.resized_width, info.resized_height, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let mut padded = ImageBuffer::from_pixel(target_w, target_h, Rgb([0u8, 0, 0]));
    image::imageops::overlay(
        &mut padded,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );
    padded
}

/// Convert an RGB buffer to a (1, H, W, 3) tensor
fn image_to_nhwc(rgb: &ImageBuffer<Rgb<u8>, Vec<u8>>, scale: PixelScale) -> Array4<f32> {
    let (width, height) = rgb.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, height as usize, width as usize, 3));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let v = pixel[c] as f32;
            tensor[[0, y as usize, x as usize, c]] = match scale {
                PixelScale::Symmetric => v / 127.5 - 1.0,
                PixelScale::Raw => v,
            };
        }
    }

    tensor
}

/// Decode image from bytes with EXIF orientation handling
pub fn decode_image(data: &[u8]) -> ImageResult<DynamicImage> {
    let image = image::load_from_memory(data)?;
    Ok(apply_exif_orientation(data, image))
}

/// Apply EXIF orientation so keypoints land on the upright image
fn apply_exif_orientation(data: &[u8], image: DynamicImage) -> DynamicImage {
    use std::io::Cursor;

    let orientation = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif_data) => exif_data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    };

    // See https://exiftool.org/TagNames/EXIF.html (Orientation)
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Letterbox geometry, used to map model coordinates back to the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeInfo {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub resized_width: u32,
    pub resized_height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl ResizeInfo {
    pub fn new(original: (u32, u32), target: (u32, u32)) -> Self {
        let (orig_w, orig_h) = original;
        let (target_w, target_h) = target;

        let scale = f32::min(
            target_w as f32 / orig_w.max(1) as f32,
            target_h as f32 / orig_h.max(1) as f32,
        );

        let new_w = ((orig_w as f32 * scale) as u32).clamp(1, target_w);
        let new_h = ((orig_h as f32 * scale) as u32).clamp(1, target_h);

        Self {
            scale,
            offset_x: (target_w - new_w) / 2,
            offset_y: (target_h - new_h) / 2,
            resized_width: new_w,
            resized_height: new_h,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Convert model input coordinates back to original image space
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let x = (x - self.offset_x as f32) / self.scale;
        let y = (y - self.offset_y as f32) / self.scale;
        (x, y)
    }
}
