//! Pluggable sources of segment label maps and attribution maps.
//!
//! Segmentation and attribution are computed outside the search. Providers
//! locate (or compute) them for a given image, and the factories below pick
//! the provider named in the config.

mod attribution;
pub mod matrix;
mod segmentation;

pub use attribution::{AttributionProvider, CsvAttributionProvider, HeatmapProvider};
pub use segmentation::{CsvLabelProvider, GridProvider, SegmentationProvider};

use std::path::{Path, PathBuf};

use crate::config::{AttributionMethod, Config, SegmentationMethod};

/// Create the segmentation provider selected in the config.
pub fn segmentation_provider(config: &Config) -> Box<dyn SegmentationProvider> {
    match config.segmentation.method {
        SegmentationMethod::CsvLabels => Box::new(CsvLabelProvider::new(config.segmentation_dir())),
        SegmentationMethod::Grid => Box::new(GridProvider::new(config.segmentation.grid_cells)),
    }
}

/// Create the attribution provider selected in the config.
pub fn attribution_provider(config: &Config) -> Box<dyn AttributionProvider> {
    match config.attribution.method {
        AttributionMethod::Heatmap => Box::new(HeatmapProvider::new(config.attribution_dir())),
        AttributionMethod::Csv => Box::new(CsvAttributionProvider::new(config.attribution_dir())),
    }
}

/// `<dir>/<stem of image_path>.<extension>`
pub(crate) fn sidecar_path(dir: &Path, image_path: &Path, extension: &str) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(format!("{stem}.{extension}"))
}
