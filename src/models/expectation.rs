//! E-step: responsibilities and log-likelihood
//!
//! For each sample the unnormalized responsibility of component k is
//! `pi_k * N(x_i | mu_k, Sigma_k)`. The row sum `s_i` is the mixture
//! density of the sample; `ln s_i` is accumulated into the log-likelihood
//! before the row is normalized. Everything is carried in log space and
//! combined with log-sum-exp, so small densities do not underflow.

use super::params::ComponentSet;
use crate::data::DataMatrix;
use crate::error::{GmmError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

/// Tolerance used when validating externally supplied responsibilities
const ROW_SUM_TOL: f64 = 1e-8;

/// What to do when a sample's mixture density is zero
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum UnderflowPolicy {
    /// Abort with `NumericalUnderflow`
    #[default]
    Fail,
    /// Clamp the row's density to this positive floor and give the
    /// sample uniform responsibilities
    Floor(f64),
}

/// N x K posterior probabilities, each row summing to 1
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsibilityMatrix {
    gamma: Array2<f64>,
    /// Rows whose mixture density was clamped by `UnderflowPolicy::Floor`
    floored: usize,
}

impl ResponsibilityMatrix {
    /// Wrap a matrix, checking that it is a valid set of row distributions
    pub fn new(gamma: Array2<f64>) -> Result<Self> {
        let (n, k) = gamma.dim();
        if n < 2 || k < 2 {
            return Err(GmmError::InvalidInputShape(format!(
                "responsibilities must be at least 2 x 2, got {} x {}",
                n, k
            )));
        }
        if gamma.iter().any(|&g| !g.is_finite() || g < 0.0) {
            return Err(GmmError::InvalidParameters(
                "responsibilities must be finite and non-negative".to_string(),
            ));
        }
        for (i, row) in gamma.rows().into_iter().enumerate() {
            let sum = row.sum();
            if (sum - 1.0).abs() > ROW_SUM_TOL {
                return Err(GmmError::InvalidParameters(format!(
                    "responsibilities of sample {} sum to {}",
                    i, sum
                )));
            }
        }
        Ok(Self { gamma, floored: 0 })
    }

    pub fn n_samples(&self) -> usize {
        self.gamma.nrows()
    }

    pub fn n_components(&self) -> usize {
        self.gamma.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.gamma.view()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.gamma
    }

    /// Number of samples that fell back to uniform responsibilities
    pub fn n_floored(&self) -> usize {
        self.floored
    }

    /// Sum of each row
    pub fn row_sums(&self) -> Array1<f64> {
        self.gamma.sum_axis(Axis(1))
    }

    /// Effective number of samples per component, `N_k = sum_i gamma(i, k)`
    pub fn effective_counts(&self) -> Array1<f64> {
        self.gamma.sum_axis(Axis(0))
    }

    /// Most probable component for each sample
    pub fn hard_labels(&self) -> Vec<usize> {
        self.gamma
            .rows()
            .into_iter()
            .map(|row| argmax(row.iter().copied()))
            .collect()
    }

    /// Probability of the most probable component for each sample
    pub fn confidence(&self) -> Vec<f64> {
        self.gamma
            .rows()
            .into_iter()
            .map(|row| row.iter().copied().fold(0.0, f64::max))
            .collect()
    }

    /// Number of samples whose hard label is each component
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_components()];
        for label in self.hard_labels() {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Index of the largest value; ties go to the lowest index
fn argmax<I: Iterator<Item = f64>>(values: I) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (k, v) in values.enumerate() {
        if v > best_val {
            best_val = v;
            best = k;
        }
    }
    best
}

/// Run the E-step
///
/// Returns the responsibility matrix and the total log-likelihood
/// `sum_i ln(sum_k pi_k N(x_i | k))` of the current parameters.
/// Rows clamped under `UnderflowPolicy::Floor` are counted in
/// [`ResponsibilityMatrix::n_floored`]; nothing is logged here.
pub fn expectation(
    data: &DataMatrix,
    components: &ComponentSet,
    policy: UnderflowPolicy,
) -> Result<(ResponsibilityMatrix, f64)> {
    let n = data.n_samples();
    let k = components.n_components();
    if n < 2 || k < 2 {
        return Err(GmmError::InvalidInputShape(format!(
            "expectation needs N > 1 and K > 1, got N = {}, K = {}",
            n, k
        )));
    }
    if data.n_features() != components.dim() {
        return Err(GmmError::InvalidInputShape(format!(
            "data has {} features, components have {}",
            data.n_features(),
            components.dim()
        )));
    }
    if let UnderflowPolicy::Floor(floor) = policy {
        if floor <= 0.0 || !floor.is_finite() {
            return Err(GmmError::InvalidParameters(format!(
                "underflow floor must be positive, got {}",
                floor
            )));
        }
    }

    let distributions = components.distributions()?;
    let points = data.view();

    // Log of the unnormalized responsibilities, one column per component
    let columns = distributions
        .par_iter()
        .zip(components.components().par_iter())
        .map(|(dist, component)| {
            let log_weight = component.weight.ln();
            dist.log_pdf_batch(&points).map(|lp| lp + log_weight)
        })
        .collect::<Result<Vec<Array1<f64>>>>()?;

    let mut log_gamma = Array2::<f64>::zeros((n, k));
    for (j, column) in columns.into_iter().enumerate() {
        log_gamma.column_mut(j).assign(&column);
    }

    let mut log_likelihood = 0.0;
    let mut gamma = Array2::<f64>::zeros((n, k));
    let mut floored = 0usize;

    for (i, (log_row, mut row)) in log_gamma
        .rows()
        .into_iter()
        .zip(gamma.rows_mut())
        .enumerate()
    {
        let max = log_row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let log_sum = if max.is_finite() {
            max + log_row.iter().map(|&l| (l - max).exp()).sum::<f64>().ln()
        } else {
            f64::NEG_INFINITY
        };

        if log_sum.is_finite() {
            // Accumulate before normalizing
            log_likelihood += log_sum;
            row.zip_mut_with(&log_row, |g, &l| *g = (l - log_sum).exp());
        } else {
            match policy {
                UnderflowPolicy::Fail => return Err(GmmError::NumericalUnderflow { sample: i }),
                UnderflowPolicy::Floor(floor) => {
                    log_likelihood += floor.ln();
                    row.fill(1.0 / k as f64);
                    floored += 1;
                }
            }
        }
    }

    Ok((ResponsibilityMatrix { gamma, floored }, log_likelihood))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gaussian::density;
    use crate::models::params::Component;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr2, array};

    fn sample_data() -> DataMatrix {
        DataMatrix::new(arr2(&[
            [0.0, 0.1],
            [0.2, -0.1],
            [4.9, 5.2],
            [5.1, 4.8],
            [2.5, 2.5],
        ]))
        .unwrap()
    }

    fn sample_components() -> ComponentSet {
        ComponentSet::new(vec![
            Component::new(array![0.0, 0.0], Array2::eye(2), 0.5),
            Component::new(array![5.0, 5.0], Array2::eye(2) * 2.0, 0.5),
        ])
        .unwrap()
    }

    #[test]
    fn test_rows_sum_to_one() {
        let (gamma, _) =
            expectation(&sample_data(), &sample_components(), UnderflowPolicy::Fail).unwrap();
        for sum in gamma.row_sums().iter() {
            assert_abs_diff_eq!(*sum, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_log_likelihood_matches_direct_sum() {
        let data = sample_data();
        let components = sample_components();
        let (gamma, ll) = expectation(&data, &components, UnderflowPolicy::Fail).unwrap();

        let mut mixture = Array1::<f64>::zeros(data.n_samples());
        let mut first = Array1::<f64>::zeros(data.n_samples());
        for (k, c) in components.iter().enumerate() {
            let weighted = density(&data.view(), &c.mean, &c.covariance).unwrap() * c.weight;
            if k == 0 {
                first.assign(&weighted);
            }
            mixture += &weighted;
        }
        let expected: f64 = mixture.iter().map(|s| s.ln()).sum();

        assert_abs_diff_eq!(ll, expected, epsilon = 1e-9);
        for i in 0..data.n_samples() {
            assert_abs_diff_eq!(gamma.view()[[i, 0]], first[i] / mixture[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_log_likelihood_is_not_post_normalization() {
        let (_, ll) =
            expectation(&sample_data(), &sample_components(), UnderflowPolicy::Fail).unwrap();
        assert!(ll < 0.0);
    }

    #[test]
    fn test_hard_labels() {
        let (gamma, _) =
            expectation(&sample_data(), &sample_components(), UnderflowPolicy::Fail).unwrap();
        let labels = gamma.hard_labels();
        assert_eq!(&labels[..4], &[0, 0, 1, 1]);
        assert_eq!(gamma.cluster_sizes().iter().sum::<usize>(), 5);
        assert!(gamma.confidence().iter().all(|&c| c >= 0.5 && c <= 1.0));
    }

    #[test]
    fn test_degenerate_shapes_rejected() {
        let err = DataMatrix::new(arr2(&[[0.0, 0.0]])).unwrap_err();
        assert!(matches!(err, GmmError::InvalidInputShape(_)));

        let err = ComponentSet::new(vec![Component::new(array![0.0, 0.0], Array2::eye(2), 1.0)])
            .unwrap_err();
        assert!(matches!(err, GmmError::InvalidInputShape(_)));
    }

    #[test]
    fn test_rejects_dimension_mismatch() {
        let data = DataMatrix::new(arr2(&[[0.0], [1.0]])).unwrap();
        let err = expectation(&data, &sample_components(), UnderflowPolicy::Fail).unwrap_err();
        assert!(matches!(err, GmmError::InvalidInputShape(_)));
    }

    #[test]
    fn test_underflow_fails() {
        let data = DataMatrix::new(arr2(&[[0.0, 0.0], [1e200, 1e200]])).unwrap();
        let err = expectation(&data, &sample_components(), UnderflowPolicy::Fail).unwrap_err();
        assert!(matches!(err, GmmError::NumericalUnderflow { sample: 1 }));
    }

    #[test]
    fn test_underflow_floor() {
        let data = DataMatrix::new(arr2(&[[0.0, 0.0], [1e200, 1e200]])).unwrap();
        let floor = 1e-300;
        let (gamma, ll) =
            expectation(&data, &sample_components(), UnderflowPolicy::Floor(floor)).unwrap();

        assert_eq!(gamma.view().row(1).to_vec(), vec![0.5, 0.5]);
        assert_eq!(gamma.n_floored(), 1);
        assert!(ll.is_finite());
        assert!(ll < floor.ln() + 1.0);
    }

    #[test]
    fn test_invalid_floor() {
        let err = expectation(
            &sample_data(),
            &sample_components(),
            UnderflowPolicy::Floor(0.0),
        )
        .unwrap_err();
        assert!(matches!(err, GmmError::InvalidParameters(_)));
    }

    #[test]
    fn test_singular_component_reported() {
        let components = ComponentSet::new(vec![
            Component::new(array![0.0, 0.0], Array2::eye(2), 0.5),
            Component::new(array![5.0, 5.0], arr2(&[[1.0, 1.0], [1.0, 1.0]]), 0.5),
        ])
        .unwrap();
        let err = expectation(&sample_data(), &components, UnderflowPolicy::Fail).unwrap_err();
        assert!(matches!(
            err,
            GmmError::SingularCovariance { component: Some(1) }
        ));
    }

    #[test]
    fn test_deterministic() {
        let data = sample_data();
        let components = sample_components();
        let a = expectation(&data, &components, UnderflowPolicy::Fail).unwrap();
        let b = expectation(&data, &components, UnderflowPolicy::Fail).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.0.n_floored(), 0);
        assert_eq!(a.1.to_bits(), b.1.to_bits());
    }

    #[test]
    fn test_responsibility_matrix_validation() {
        assert!(ResponsibilityMatrix::new(arr2(&[[0.5, 0.5], [1.0, 0.0]])).is_ok());
        assert!(ResponsibilityMatrix::new(arr2(&[[0.5, 0.6], [1.0, 0.0]])).is_err());
        assert!(ResponsibilityMatrix::new(arr2(&[[1.0], [1.0]])).is_err());
        assert!(ResponsibilityMatrix::new(arr2(&[[1.5, -0.5], [1.0, 0.0]])).is_err());
    }
}
