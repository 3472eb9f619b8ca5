//! Masked-image construction for candidate subsets.
//!
//! Each candidate becomes an image tensor in which the selected segments are
//! either the only visible region ("keep-only") or the only hidden region
//! ("occlude"). Hidden pixels are replaced by a per-channel fill value.

use image::{GrayImage, Luma};
use ndarray::{Array3, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::SearchResult;
use crate::segments::{ImageTensor, SegmentMap};
use crate::types::CandidateSubset;

/// Which pixels of a candidate subset stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskPolicy {
    /// Subset segments keep their values; everything else is filled
    #[default]
    KeepOnly,
    /// Subset segments are filled; everything else keeps its values
    Occlude,
}

/// Value written into hidden pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Background {
    /// Zero in tensor space (the dataset mean after normalization)
    Zero,
    /// Per-channel mean of the unmasked image
    #[default]
    ChannelMean,
    /// A fixed value for every channel
    Constant(f32),
}

/// Builds masked tensors for one image and segment map.
///
/// The policy and fill values are fixed at construction, so every subset in
/// a search run is masked the same way.
pub struct MaskBuilder<'a> {
    image: &'a ImageTensor,
    segments: &'a SegmentMap,
    policy: MaskPolicy,
    fill: Vec<f32>,
}

impl<'a> MaskBuilder<'a> {
    pub fn new(
        image: &'a ImageTensor,
        segments: &'a SegmentMap,
        policy: MaskPolicy,
        background: Background,
    ) -> SearchResult<Self> {
        segments.check_matches(image)?;

        let channels = image.dim().0;
        let fill = match background {
            Background::Zero => vec![0.0; channels],
            Background::Constant(v) => vec![v; channels],
            Background::ChannelMean => image
                .axis_iter(Axis(0))
                .map(|plane| plane.mean().unwrap_or(0.0))
                .collect(),
        };

        Ok(Self {
            image,
            segments,
            policy,
            fill,
        })
    }

    pub fn policy(&self) -> MaskPolicy {
        self.policy
    }

    /// Per-channel fill values in use.
    pub fn fill(&self) -> &[f32] {
        &self.fill
    }

    /// Build the masked tensor for one subset. Same shape as the image.
    pub fn build(&self, subset: &CandidateSubset) -> Array3<f32> {
        let keep_selected = matches!(self.policy, MaskPolicy::KeepOnly);

        let mut out = self.image.clone();
        let labels = self.segments.labels();
        for (c, mut plane) in out.axis_iter_mut(Axis(0)).enumerate() {
            let fill = self.fill[c];
            for (value, &label) in plane.iter_mut().zip(labels.iter()) {
                if subset.contains(label) != keep_selected {
                    *value = fill;
                }
            }
        }
        out
    }

    /// Build tensors for a batch, in input order.
    ///
    /// Items are independent, so with `parallel` set they are built on the
    /// rayon pool.
    pub fn build_batch(&self, subsets: &[CandidateSubset], parallel: bool) -> Vec<Array3<f32>> {
        if parallel && subsets.len() > 1 {
            subsets.par_iter().map(|s| self.build(s)).collect()
        } else {
            subsets.iter().map(|s| self.build(s)).collect()
        }
    }
}

/// Render a subset as a binary mask image (255 inside the subset, 0 outside).
pub fn render_region_mask(segments: &SegmentMap, subset: &CandidateSubset) -> GrayImage {
    let (h, w) = segments.shape();
    let labels = segments.labels();
    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        if subset.contains(labels[[y as usize, x as usize]]) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
