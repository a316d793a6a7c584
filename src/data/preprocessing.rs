//! Feature scaling
//!
//! Scaling changes the log-likelihood values and the convergence speed of EM,
//! so it is applied by the caller before fitting rather than inside the fit.

use super::types::DataMatrix;
use crate::error::Result;
use ndarray::{Array1, Array2};

/// Min-max scaler mapping each feature into [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    /// Per-feature minimum seen during fit
    pub min: Array1<f64>,
    /// Per-feature range (max - min)
    pub range: Array1<f64>,
}

impl MinMaxScaler {
    /// Learn per-feature bounds
    pub fn fit(data: &DataMatrix) -> Self {
        let min = data.column_min();
        let range = data.column_max() - &min;
        Self { min, range }
    }

    /// Scale samples into [0, 1]; constant features map to 0
    pub fn transform(&self, data: &DataMatrix) -> Result<DataMatrix> {
        let mut scaled: Array2<f64> = data.as_ref().clone();
        for (j, mut column) in scaled.columns_mut().into_iter().enumerate() {
            let min = self.min[j];
            let range = self.range[j];
            if range > 1e-12 {
                column.mapv_inplace(|x| (x - min) / range);
            } else {
                column.fill(0.0);
            }
        }
        DataMatrix::new(scaled)
    }

    /// Map a scaled point (e.g. a fitted mean) back to original units
    pub fn inverse_transform_point(&self, point: &Array1<f64>) -> Array1<f64> {
        point * &self.range + &self.min
    }
}

/// Fit a scaler and apply it in one step
pub fn min_max_scale(data: &DataMatrix) -> Result<(DataMatrix, MinMaxScaler)> {
    let scaler = MinMaxScaler::fit(data);
    let scaled = scaler.transform(data)?;
    Ok((scaled, scaler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_min_max_bounds() {
        let data =
            DataMatrix::from_rows(&[vec![-5.0, 10.0], vec![5.0, 20.0], vec![0.0, 15.0]]).unwrap();
        let (scaled, _) = min_max_scale(&data).unwrap();

        assert_eq!(scaled.column_min().to_vec(), vec![0.0, 0.0]);
        assert_eq!(scaled.column_max().to_vec(), vec![1.0, 1.0]);
        assert_abs_diff_eq!(scaled.row(2)[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_column() {
        let data = DataMatrix::from_rows(&[vec![3.0, 1.0], vec![3.0, 2.0]]).unwrap();
        let (scaled, _) = min_max_scale(&data).unwrap();
        assert_eq!(scaled.view().column(0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_inverse_transform() {
        let data = DataMatrix::from_rows(&[vec![-5.0, 10.0], vec![5.0, 20.0]]).unwrap();
        let scaler = MinMaxScaler::fit(&data);
        let restored = scaler.inverse_transform_point(&array![0.5, 0.25]);
        assert_abs_diff_eq!(restored[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(restored[1], 12.5, epsilon = 1e-12);
    }
}
