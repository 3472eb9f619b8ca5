//! Segmentation providers: produce a label map for an input image.

use std::path::{Path, PathBuf};

use ndarray::Array2;

use super::matrix::{read_matrix, resize_nearest};
use super::sidecar_path;
use crate::error::InputError;
use crate::segments::SegmentMap;
use crate::types::SegmentId;

/// Source of per-pixel segment labels.
pub trait SegmentationProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Label map for `image_path`, sized `(height, width)` to match the
    /// preprocessed image tensor.
    fn segment(&self, image_path: &Path, shape: (usize, usize)) -> Result<SegmentMap, InputError>;
}

/// Reads precomputed label maps from `<dir>/<image stem>.csv`.
///
/// Labels may start at any integer; they are shifted to start at 0. Maps of
/// a different size than the tensor are resampled by nearest neighbour.
#[derive(Debug, Clone)]
pub struct CsvLabelProvider {
    dir: PathBuf,
}

impl CsvLabelProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SegmentationProvider for CsvLabelProvider {
    fn name(&self) -> &str {
        "csv_labels"
    }

    fn segment(&self, image_path: &Path, shape: (usize, usize)) -> Result<SegmentMap, InputError> {
        let path = sidecar_path(&self.dir, image_path, "csv");
        if !path.exists() {
            return Err(InputError::FileNotFound(path));
        }
        let fail = |message: String| InputError::Segmentation {
            path: path.clone(),
            message,
        };

        let raw: Array2<i64> = read_matrix(&path).map_err(fail)?;
        if raw.dim() != shape {
            tracing::debug!(
                "Resampling label map {:?} from {:?} to {:?}",
                path,
                raw.dim(),
                shape
            );
        }
        let resized = resize_nearest(&raw, shape);
        SegmentMap::from_raw_labels(resized).map_err(|e| fail(e.to_string()))
    }
}

/// Splits the image into a uniform `cells × cells` grid.
///
/// Needs no side files; useful as a baseline and for smoke tests.
#[derive(Debug, Clone, Copy)]
pub struct GridProvider {
    cells: u32,
}

impl GridProvider {
    pub fn new(cells: u32) -> Self {
        Self { cells: cells.max(1) }
    }
}

impl SegmentationProvider for GridProvider {
    fn name(&self) -> &str {
        "grid"
    }

    fn segment(&self, image_path: &Path, shape: (usize, usize)) -> Result<SegmentMap, InputError> {
        let (h, w) = shape;
        let cells = self.cells as usize;
        // A grid finer than the image would leave empty cells.
        let rows = cells.min(h.max(1));
        let cols = cells.min(w.max(1));
        let labels = Array2::from_shape_fn((h, w), |(y, x)| {
            let cy = y * rows / h;
            let cx = x * cols / w;
            (cy * cols + cx) as SegmentId
        });
        SegmentMap::new(labels).map_err(|e| InputError::Segmentation {
            path: image_path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
