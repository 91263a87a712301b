//! Sparse row vectors and row-major feature matrices.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Sparse feature vector with strictly increasing column indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build a vector from `(column, value)` pairs already sorted by column without repeats.
    pub(crate) fn from_sorted(pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let (indices, values): (Vec<usize>, Vec<f64>) = pairs.into_iter().unzip();
        debug_assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
        Self { indices, values }
    }

    /// Build a vector from arbitrary pairs; duplicate columns are summed.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut merged = std::collections::BTreeMap::new();
        for (index, value) in pairs {
            *merged.entry(index).or_insert(0.0) += value;
        }
        Self::from_sorted(merged)
    }

    /// Iterate over stored `(column, value)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Whether the vector has no stored entries.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Largest column index plus one, or zero for an empty vector.
    pub fn min_dimension(&self) -> usize {
        self.indices.last().map_or(0, |last| last + 1)
    }

    /// Squared Euclidean norm.
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|value| value * value).sum()
    }

    /// Dot product with a dense weight vector. Columns beyond `dense` contribute nothing.
    pub fn dot(&self, dense: &Array1<f64>) -> f64 {
        self.iter()
            .filter_map(|(index, value)| dense.get(index).map(|weight| weight * value))
            .sum()
    }
}

/// Row-major collection of sparse rows sharing one column space.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<FeatureVector>,
    n_features: usize,
}

impl FeatureMatrix {
    /// Assemble a matrix; every row must fit within `n_features` columns.
    pub fn new(rows: Vec<FeatureVector>, n_features: usize) -> Self {
        debug_assert!(rows.iter().all(|row| row.min_dimension() <= n_features));
        Self { rows, n_features }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Borrow all rows.
    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    /// Borrow a single row.
    pub fn row(&self, index: usize) -> Option<&FeatureVector> {
        self.rows.get(index)
    }

    /// Copy the rows at `indices` into a new matrix with the same column space.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            n_features: self.n_features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn from_pairs_sorts_and_merges_duplicates() {
        let vector = FeatureVector::from_pairs([(3, 1.0), (1, 2.0), (3, 0.5)]);
        let entries: Vec<_> = vector.iter().collect();
        assert_eq!(entries, vec![(1, 2.0), (3, 1.5)]);
        assert_eq!(vector.min_dimension(), 4);
    }

    #[test]
    fn dot_ignores_columns_outside_weights() {
        let vector = FeatureVector::from_pairs([(0, 2.0), (2, 1.0), (9, 5.0)]);
        let weights = array![0.5, 3.0, -1.0];
        assert_eq!(vector.dot(&weights), 0.0);
        assert_eq!(vector.norm_squared(), 30.0);
    }

    #[test]
    fn select_keeps_column_space() {
        let matrix = FeatureMatrix::new(
            vec![
                FeatureVector::from_pairs([(0, 1.0)]),
                FeatureVector::from_pairs([(1, 1.0)]),
            ],
            5,
        );
        let picked = matrix.select(&[1]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked.n_features(), 5);
        assert_eq!(picked.row(0), matrix.row(1));
    }
}
