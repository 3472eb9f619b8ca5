//! Attribution providers: produce a per-pixel saliency map for an image.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use ndarray::Array2;

use super::matrix::{read_matrix, resize_nearest};
use super::sidecar_path;
use crate::error::InputError;

/// Source of per-pixel attribution values. Higher means more salient.
pub trait AttributionProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Attribution map for `image_path`, sized `(height, width)`.
    fn attribute(&self, image_path: &Path, shape: (usize, usize))
        -> Result<Array2<f32>, InputError>;
}

/// Reads grayscale saliency images from `<dir>/<image stem>.png`.
///
/// Intensities map to `[0, 1]`; the image is resized to the tensor shape.
#[derive(Debug, Clone)]
pub struct HeatmapProvider {
    dir: PathBuf,
}

impl HeatmapProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AttributionProvider for HeatmapProvider {
    fn name(&self) -> &str {
        "heatmap"
    }

    fn attribute(
        &self,
        image_path: &Path,
        shape: (usize, usize),
    ) -> Result<Array2<f32>, InputError> {
        let path = sidecar_path(&self.dir, image_path, "png");
        if !path.exists() {
            return Err(InputError::FileNotFound(path));
        }
        let heatmap = image::open(&path).map_err(|e| InputError::Attribution {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let (h, w) = shape;
        let gray = heatmap
            .resize_exact(w as u32, h as u32, FilterType::Triangle)
            .to_luma8();
        Ok(Array2::from_shape_fn((h, w), |(y, x)| {
            f32::from(gray.get_pixel(x as u32, y as u32).0[0]) / 255.0
        }))
    }
}

/// Reads float matrices from `<dir>/<image stem>.csv`.
#[derive(Debug, Clone)]
pub struct CsvAttributionProvider {
    dir: PathBuf,
}

impl CsvAttributionProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AttributionProvider for CsvAttributionProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn attribute(
        &self,
        image_path: &Path,
        shape: (usize, usize),
    ) -> Result<Array2<f32>, InputError> {
        let path = sidecar_path(&self.dir, image_path, "csv");
        if !path.exists() {
            return Err(InputError::FileNotFound(path));
        }
        let matrix: Array2<f32> = read_matrix(&path).map_err(|message| {
            InputError::Attribution {
                path: path.clone(),
                message,
            }
        })?;
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(InputError::Attribution {
                path,
                message: "attribution map contains NaN or infinite values".into(),
            });
        }
        Ok(resize_nearest(&matrix, shape))
    }
}
