//! Synthetic Gaussian blobs for demos and tests

use super::types::DataMatrix;
use crate::error::{GmmError, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Centers used by the three-cluster demo
pub const DEMO_CENTERS: [[f64; 2]; 3] = [[0.0, 0.0], [5.0, 5.0], [-5.0, 5.0]];

/// Draw `per_cluster` isotropic normal points around each center
///
/// Returns the samples and the index of the generating center for each
/// sample. Samples are ordered cluster by cluster.
pub fn make_blobs(
    centers: &[Vec<f64>],
    std_dev: f64,
    per_cluster: usize,
    seed: u64,
) -> Result<(DataMatrix, Vec<usize>)> {
    let d = centers.first().map(|c| c.len()).unwrap_or(0);
    if centers.iter().any(|c| c.len() != d) {
        return Err(GmmError::InvalidInputShape(
            "all centers must have the same dimension".to_string(),
        ));
    }
    if std_dev < 0.0 || !std_dev.is_finite() {
        return Err(GmmError::InvalidParameters(format!(
            "std_dev must be finite and non-negative, got {}",
            std_dev
        )));
    }
    let noise = Normal::new(0.0, std_dev)
        .map_err(|e| GmmError::InvalidParameters(format!("std_dev {}: {}", std_dev, e)))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let n = centers.len() * per_cluster;
    let mut data = Array2::zeros((n, d));
    let mut labels = Vec::with_capacity(n);

    for (c, center) in centers.iter().enumerate() {
        for i in 0..per_cluster {
            let mut row = data.row_mut(c * per_cluster + i);
            for (j, value) in row.iter_mut().enumerate() {
                *value = center[j] + noise.sample(&mut rng);
            }
            labels.push(c);
        }
    }

    Ok((DataMatrix::new(data)?, labels))
}

/// Three unit-variance 2-D clusters at (0,0), (5,5) and (-5,5)
pub fn three_blobs(per_cluster: usize, seed: u64) -> Result<(DataMatrix, Vec<usize>)> {
    let centers: Vec<Vec<f64>> = DEMO_CENTERS.iter().map(|c| c.to_vec()).collect();
    make_blobs(&centers, 1.0, per_cluster, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Axis;

    #[test]
    fn test_blob_shape_and_labels() {
        let (data, labels) = three_blobs(50, 1).unwrap();
        assert_eq!(data.n_samples(), 150);
        assert_eq!(data.n_features(), 2);
        assert_eq!(labels.iter().filter(|&&l| l == 2).count(), 50);
    }

    #[test]
    fn test_blob_means_near_centers() {
        let (data, _) = three_blobs(400, 9).unwrap();
        let first = data.view().slice_move(ndarray::s![0..400, ..]).to_owned();
        let mean = first.mean_axis(Axis(0)).unwrap();
        assert!(mean[0].abs() < 0.2);
        assert!(mean[1].abs() < 0.2);
    }

    #[test]
    fn test_same_seed_same_data() {
        let (a, _) = three_blobs(10, 3).unwrap();
        let (b, _) = three_blobs(10, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_std_rejected() {
        let err = make_blobs(&[vec![0.0], vec![1.0]], -1.0, 5, 0).unwrap_err();
        assert!(matches!(err, GmmError::InvalidParameters(_)));
    }

    #[test]
    fn test_non_finite_std_rejected() {
        for std_dev in [f64::NAN, f64::INFINITY] {
            let err = make_blobs(&[vec![0.0], vec![1.0]], std_dev, 5, 0).unwrap_err();
            assert!(matches!(err, GmmError::InvalidParameters(_)));
        }
    }
}
