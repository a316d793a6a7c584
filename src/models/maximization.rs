//! M-step: re-estimate means, covariances and mixing weights

use super::expectation::ResponsibilityMatrix;
use super::params::{Component, ComponentSet};
use crate::data::DataMatrix;
use crate::error::{GmmError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

/// Options for the M-step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaximizationOptions {
    /// Added to every covariance diagonal; 0 keeps the plain ML estimate
    pub reg_covar: f64,
    /// Effective sample counts at or below this are treated as collapsed
    pub collapse_threshold: f64,
}

impl Default for MaximizationOptions {
    fn default() -> Self {
        Self {
            reg_covar: 0.0,
            collapse_threshold: 1e-10,
        }
    }
}

/// Result of the M-step
#[derive(Debug, Clone, PartialEq)]
pub struct MaximizationOutput {
    /// Replacement parameters
    pub components: ComponentSet,
    /// `N_k`, the responsibility mass of each component
    pub effective_counts: Array1<f64>,
}

/// Run the M-step
///
/// Each component is estimated independently from its column of
/// responsibilities, so the K estimates run in parallel.
pub fn maximization(
    data: &DataMatrix,
    responsibilities: &ResponsibilityMatrix,
    options: MaximizationOptions,
) -> Result<MaximizationOutput> {
    let n = data.n_samples();
    let k = responsibilities.n_components();
    if responsibilities.n_samples() != n {
        return Err(GmmError::InvalidInputShape(format!(
            "{} rows of responsibilities for {} samples",
            responsibilities.n_samples(),
            n
        )));
    }
    if n < 2 || k < 2 {
        return Err(GmmError::InvalidInputShape(format!(
            "maximization needs N > 1 and K > 1, got N = {}, K = {}",
            n, k
        )));
    }
    if options.reg_covar < 0.0 || !options.reg_covar.is_finite() {
        return Err(GmmError::InvalidParameters(format!(
            "reg_covar must be non-negative, got {}",
            options.reg_covar
        )));
    }

    let points = data.view();
    let gamma = responsibilities.view();

    let estimates = (0..k)
        .into_par_iter()
        .map(|j| estimate_component(points, gamma.column(j), j, n as f64, options))
        .collect::<Result<Vec<(Component, f64)>>>()?;

    let (components, counts): (Vec<Component>, Vec<f64>) = estimates.into_iter().unzip();

    Ok(MaximizationOutput {
        components: ComponentSet::new(components)?,
        effective_counts: Array1::from(counts),
    })
}

fn estimate_component(
    points: ArrayView2<'_, f64>,
    gamma: ArrayView1<'_, f64>,
    index: usize,
    n: f64,
    options: MaximizationOptions,
) -> Result<(Component, f64)> {
    let n_k = gamma.sum();
    if n_k.is_nan() || n_k <= options.collapse_threshold {
        return Err(GmmError::ComponentCollapse {
            component: index,
            effective_count: n_k,
        });
    }

    // Responsibility-weighted centroid
    let mean: Array1<f64> = gamma.dot(&points) / n_k;

    // Weighted scatter around the new mean, as one reduction over samples
    let centered = &points - &mean;
    let weighted = &centered * &gamma.insert_axis(Axis(1));
    let scatter: Array2<f64> = weighted.t().dot(&centered) / n_k;

    let mut covariance = (&scatter + &scatter.t()) * 0.5;
    if options.reg_covar > 0.0 {
        covariance
            .diag_mut()
            .mapv_inplace(|v| v + options.reg_covar);
    }

    Ok((Component::new(mean, covariance, n_k / n), n_k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    fn sample_data() -> DataMatrix {
        DataMatrix::new(arr2(&[[0.0, 0.0], [2.0, 0.0], [10.0, 10.0], [12.0, 14.0]])).unwrap()
    }

    fn hard_split() -> ResponsibilityMatrix {
        ResponsibilityMatrix::new(arr2(&[[1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]]))
            .unwrap()
    }

    #[test]
    fn test_hard_assignment_estimates() {
        let out = maximization(&sample_data(), &hard_split(), MaximizationOptions::default())
            .unwrap();
        let c0 = &out.components.components()[0];
        let c1 = &out.components.components()[1];

        assert_eq!(c0.mean.to_vec(), vec![1.0, 0.0]);
        assert_eq!(c1.mean.to_vec(), vec![11.0, 12.0]);
        // Population covariance of {(0,0), (2,0)}
        assert_abs_diff_eq!(c0.covariance[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c0.covariance[[1, 1]], 0.0, epsilon = 1e-12);
        // {(10,10), (12,14)}: var x = 1, var y = 4, cov = 2
        assert_abs_diff_eq!(c1.covariance[[0, 1]], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c1.covariance[[1, 1]], 4.0, epsilon = 1e-12);
        assert_eq!(out.effective_counts.to_vec(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let gamma = ResponsibilityMatrix::new(arr2(&[
            [0.9, 0.1],
            [0.7, 0.3],
            [0.2, 0.8],
            [0.05, 0.95],
        ]))
        .unwrap();
        let out = maximization(&sample_data(), &gamma, MaximizationOptions::default()).unwrap();
        assert_abs_diff_eq!(out.components.weights().sum(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.components.weights()[0], 1.85 / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_symmetric() {
        let gamma = ResponsibilityMatrix::new(arr2(&[
            [0.3, 0.7],
            [0.6, 0.4],
            [0.25, 0.75],
            [0.5, 0.5],
        ]))
        .unwrap();
        let out = maximization(&sample_data(), &gamma, MaximizationOptions::default()).unwrap();
        for c in out.components.iter() {
            assert_eq!(c.covariance[[0, 1]], c.covariance[[1, 0]]);
        }
    }

    #[test]
    fn test_soft_mean_is_weighted_centroid() {
        let gamma = ResponsibilityMatrix::new(arr2(&[
            [0.5, 0.5],
            [0.5, 0.5],
            [0.5, 0.5],
            [0.5, 0.5],
        ]))
        .unwrap();
        let out = maximization(&sample_data(), &gamma, MaximizationOptions::default()).unwrap();
        let mean = &out.components.components()[0].mean;
        assert_abs_diff_eq!(mean[0], 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mean[1], 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reg_covar_added_to_diagonal() {
        let options = MaximizationOptions {
            reg_covar: 0.5,
            ..Default::default()
        };
        let out = maximization(&sample_data(), &hard_split(), options).unwrap();
        let c0 = &out.components.components()[0];
        assert_abs_diff_eq!(c0.covariance[[1, 1]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(c0.covariance[[0, 1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_component_collapse() {
        let gamma = ResponsibilityMatrix::new(arr2(&[
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]))
        .unwrap();
        let err = maximization(&sample_data(), &gamma, MaximizationOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GmmError::ComponentCollapse { component: 2, .. }
        ));
    }

    #[test]
    fn test_row_count_mismatch() {
        let gamma = ResponsibilityMatrix::new(arr2(&[[1.0, 0.0], [0.0, 1.0]])).unwrap();
        let err = maximization(&sample_data(), &gamma, MaximizationOptions::default())
            .unwrap_err();
        assert!(matches!(err, GmmError::InvalidInputShape(_)));
    }

    #[test]
    fn test_inputs_not_mutated() {
        let data = sample_data();
        let gamma = hard_split();
        let before = (data.clone(), gamma.clone());
        maximization(&data, &gamma, MaximizationOptions::default()).unwrap();
        assert_eq!(before, (data, gamma));
    }
}
