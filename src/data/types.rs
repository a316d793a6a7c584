//! Data matrix type

use crate::error::{GmmError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// N x D matrix of samples, one row per point
///
/// Construction guarantees at least two samples, at least one feature,
/// and that every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    data: Array2<f64>,
}

impl DataMatrix {
    /// Wrap an array, validating its shape and contents
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let (n, d) = data.dim();
        if n < 2 {
            return Err(GmmError::InvalidInputShape(format!(
                "need at least 2 samples, got {}",
                n
            )));
        }
        if d == 0 {
            return Err(GmmError::InvalidInputShape(
                "samples must have at least one feature".to_string(),
            ));
        }
        if let Some(((i, j), _)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(GmmError::InvalidInputShape(format!(
                "non-finite value at row {}, column {}",
                i, j
            )));
        }
        Ok(Self { data })
    }

    /// Build from row vectors
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let d = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(i) = rows.iter().position(|r| r.len() != d) {
            return Err(GmmError::InvalidInputShape(format!(
                "row {} has {} columns, expected {}",
                i,
                rows[i].len(),
                d
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((rows.len(), d), flat)
            .map_err(|e| GmmError::InvalidInputShape(e.to_string()))?;
        Self::new(data)
    }

    /// Number of samples (N)
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of features (D)
    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    /// Borrow the underlying array
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Get a single sample
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Per-feature minimum
    pub fn column_min(&self) -> Array1<f64> {
        self.data
            .fold_axis(Axis(0), f64::INFINITY, |acc, &x| acc.min(x))
    }

    /// Per-feature maximum
    pub fn column_max(&self) -> Array1<f64> {
        self.data
            .fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &x| acc.max(x))
    }

    /// Consume and return the underlying array
    pub fn into_inner(self) -> Array2<f64> {
        self.data
    }
}

impl AsRef<Array2<f64>> for DataMatrix {
    fn as_ref(&self) -> &Array2<f64> {
        &self.data
    }
}

impl TryFrom<Array2<f64>> for DataMatrix {
    type Error = GmmError;

    fn try_from(data: Array2<f64>) -> Result<Self> {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_data_matrix_shape() {
        let data = DataMatrix::new(arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]])).unwrap();
        assert_eq!(data.n_samples(), 3);
        assert_eq!(data.n_features(), 2);
    }

    #[test]
    fn test_rejects_single_sample() {
        let err = DataMatrix::new(arr2(&[[1.0, 2.0]])).unwrap_err();
        assert!(matches!(err, GmmError::InvalidInputShape(_)));
    }

    #[test]
    fn test_rejects_non_finite() {
        let err = DataMatrix::new(arr2(&[[1.0, f64::NAN], [3.0, 4.0]])).unwrap_err();
        assert!(err.to_string().contains("row 0, column 1"));
    }

    #[test]
    fn test_from_rows_ragged() {
        let err = DataMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, GmmError::InvalidInputShape(_)));
    }

    #[test]
    fn test_column_range() {
        let data = DataMatrix::from_rows(&[vec![1.0, -2.0], vec![3.0, 4.0], vec![0.5, 1.0]])
            .unwrap();
        assert_eq!(data.column_min().to_vec(), vec![0.5, -2.0]);
        assert_eq!(data.column_max().to_vec(), vec![3.0, 4.0]);
    }
}
