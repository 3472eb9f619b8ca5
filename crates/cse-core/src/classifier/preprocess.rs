//! Image preprocessing for classifier input.
//!
//! Resizes to the model's square input size, converts to the model's channel
//! count (1 = luma, 3 = RGB), and normalizes each channel with
//! `(pixel/255 - mean) / std`. Output layout is CHW; the evaluator stacks
//! items into NCHW batches.

use image::DynamicImage;
use ndarray::Array3;

use crate::config::ModelConfig;

/// Shape and normalization expected by a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub image_size: u32,
    pub channels: usize,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl From<&ModelConfig> for InputSpec {
    fn from(config: &ModelConfig) -> Self {
        Self {
            image_size: config.image_size,
            channels: config.channels as usize,
            mean: config.mean.clone(),
            std: config.std.clone(),
        }
    }
}

/// Preprocess an image into a normalized CHW tensor.
///
/// `spec` is assumed validated (mean/std lengths equal `channels`).
pub fn preprocess(image: &DynamicImage, spec: &InputSpec) -> Array3<f32> {
    let size = spec.image_size;
    let resized = image.resize_exact(size, size, image::imageops::FilterType::Triangle);

    let raw: Vec<u8> = if spec.channels == 1 {
        resized.to_luma8().into_raw()
    } else {
        resized.to_rgb8().into_raw()
    };
    let pixel_channels = if spec.channels == 1 { 1 } else { 3 };

    let side = size as usize;
    let mut tensor = Array3::<f32>::zeros((spec.channels, side, side));
    for (i, pixel) in raw.chunks_exact(pixel_channels).enumerate() {
        let y = i / side;
        let x = i % side;
        for (c, &val) in pixel.iter().enumerate().take(spec.channels) {
            tensor[[c, y, x]] = (val as f32 / 255.0 - spec.mean[c]) / spec.std[c];
        }
    }

    tensor
}
