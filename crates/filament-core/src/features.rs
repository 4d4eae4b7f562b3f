use crate::{EmbeddingTable, Error, Result};
use ndarray::Array2;
use std::path::Path;

/// Paired per-node state matrices: a group half and a feature half.
///
/// Both pipelines consume node state as two matrices of identical shape
/// `(num_nodes, dim)`: the solver seeds its G and F estimates from them,
/// and the trainer encodes each half through the same network. The pairing
/// is validated at construction; downstream code never re-checks shapes.
#[derive(Debug, Clone)]
pub struct FeaturePair {
    group: Array2<f32>,
    feature: Array2<f32>,
}

impl FeaturePair {
    /// Pair two matrices, failing fast when their shapes disagree.
    pub fn new(group: Array2<f32>, feature: Array2<f32>) -> Result<Self> {
        if group.dim() != feature.dim() {
            return Err(Error::ShapeMismatch {
                group: group.dim(),
                feature: feature.dim(),
            });
        }
        Ok(Self { group, feature })
    }

    /// Load both halves from embedding-table files, one file per half.
    ///
    /// Ids in the files are ignored here; row order must match the graph's
    /// node insertion order.
    pub fn from_files(group_path: impl AsRef<Path>, feature_path: impl AsRef<Path>) -> Result<Self> {
        let group = EmbeddingTable::read_from(group_path)?;
        let feature = EmbeddingTable::read_from(feature_path)?;
        Self::new(group.values, feature.values)
    }

    /// Number of nodes (rows).
    pub fn num_nodes(&self) -> usize {
        self.group.nrows()
    }

    /// State dimension (columns).
    pub fn dim(&self) -> usize {
        self.group.ncols()
    }

    /// The group half.
    pub fn group(&self) -> &Array2<f32> {
        &self.group
    }

    /// The feature half.
    pub fn feature(&self) -> &Array2<f32> {
        &self.feature
    }

    /// Consume the pair, yielding (group, feature).
    pub fn into_parts(self) -> (Array2<f32>, Array2<f32>) {
        (self.group, self.feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_accepts_matching_shapes() {
        let pair = FeaturePair::new(Array2::zeros((4, 16)), Array2::ones((4, 16))).unwrap();
        assert_eq!(pair.num_nodes(), 4);
        assert_eq!(pair.dim(), 16);
    }

    #[test]
    fn test_pair_rejects_mismatched_rows() {
        let err = FeaturePair::new(Array2::zeros((4, 16)), Array2::zeros((5, 16)));
        assert!(matches!(err, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_pair_rejects_mismatched_dims() {
        let err = FeaturePair::new(Array2::zeros((4, 16)), Array2::zeros((4, 8)));
        assert!(matches!(err, Err(Error::ShapeMismatch { .. })));
    }
}
