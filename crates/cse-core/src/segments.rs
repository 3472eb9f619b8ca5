//! Image tensors and validated segment label maps.

use ndarray::{Array2, Array3};
use std::collections::BTreeSet;

use crate::error::{SearchError, SearchResult};
use crate::types::SegmentId;

/// A preprocessed image in CHW layout, read-only to the search.
pub type ImageTensor = Array3<f32>;

/// Per-pixel segment labels for one image.
///
/// Every pixel carries a label in `[0, K)` where `K` is `label_bound()`.
/// Labels need not be contiguous; `segment_ids()` lists the ones present.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMap {
    labels: Array2<SegmentId>,
    ids: BTreeSet<SegmentId>,
}

impl SegmentMap {
    /// Wrap a label array that already starts at 0.
    pub fn new(labels: Array2<SegmentId>) -> SearchResult<Self> {
        if labels.is_empty() {
            return Err(SearchError::invalid("segment map is empty"));
        }
        let ids = labels.iter().copied().collect();
        Ok(Self { labels, ids })
    }

    /// Build a map from raw signed labels, shifting them so the smallest is 0.
    ///
    /// Segmenters differ on the first label (BASS CSV output and SLIC with
    /// `start_label=1` both start at 1); the search only needs distinct ids.
    pub fn from_raw_labels(raw: Array2<i64>) -> SearchResult<Self> {
        let min = raw
            .iter()
            .copied()
            .min()
            .ok_or_else(|| SearchError::invalid("segment map is empty"))?;
        let mut overflow = false;
        let labels = raw.mapv(|v| {
            match v.checked_sub(min).and_then(|d| SegmentId::try_from(d).ok()) {
                Some(id) => id,
                None => {
                    overflow = true;
                    0
                }
            }
        });
        if overflow {
            return Err(SearchError::invalid("segment labels span more than u32 range"));
        }
        Self::new(labels)
    }

    /// Label array, indexed `[y, x]`.
    pub fn labels(&self) -> &Array2<SegmentId> {
        &self.labels
    }

    /// `(height, width)` of the map.
    pub fn shape(&self) -> (usize, usize) {
        self.labels.dim()
    }

    /// Distinct segment ids present in the map, ascending.
    pub fn segment_ids(&self) -> &BTreeSet<SegmentId> {
        &self.ids
    }

    pub fn segment_count(&self) -> usize {
        self.ids.len()
    }

    /// One past the largest label.
    pub fn label_bound(&self) -> usize {
        self.ids.last().map_or(0, |&max| max as usize + 1)
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.ids.contains(&id)
    }

    /// Check that the map covers the spatial extent of a CHW image.
    pub fn check_matches(&self, image: &ImageTensor) -> SearchResult<()> {
        let (_, h, w) = image.dim();
        if self.shape() != (h, w) {
            return Err(SearchError::invalid(format!(
                "segment map shape {:?} does not match image shape ({h}, {w})",
                self.shape()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_segment_ids_and_bound() {
        let map = SegmentMap::new(array![[0, 0, 3], [1, 1, 3]]).unwrap();
        assert_eq!(map.segment_ids().iter().copied().collect::<Vec<_>>(), vec![0, 1, 3]);
        assert_eq!(map.segment_count(), 3);
        assert_eq!(map.label_bound(), 4);
        assert!(map.contains(3));
        assert!(!map.contains(2));
    }

    #[test]
    fn test_from_raw_labels_shifts_to_zero() {
        let map = SegmentMap::from_raw_labels(array![[1i64, 2], [2, 3]]).unwrap();
        assert_eq!(map.labels(), &array![[0u32, 1], [1, 2]]);
    }

    #[test]
    fn test_from_raw_labels_rejects_wide_span() {
        let err = SegmentMap::from_raw_labels(array![[i64::MIN, i64::MAX]]).unwrap_err();
        assert!(err.to_string().contains("u32 range"));
        let err = SegmentMap::from_raw_labels(array![[0i64, 1 << 33]]).unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_map_rejected() {
        let err = SegmentMap::new(Array2::<SegmentId>::zeros((0, 0))).unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn test_check_matches_image_shape() {
        let map = SegmentMap::new(Array2::zeros((4, 5))).unwrap();
        assert!(map.check_matches(&ImageTensor::zeros((3, 4, 5))).is_ok());
        assert!(map.check_matches(&ImageTensor::zeros((3, 5, 4))).is_err());
    }
}
