//! Multivariate Gaussian density
//!
//! Densities are evaluated through a Cholesky factorization of the
//! covariance, `Sigma = L L^T`. The log-determinant is `2 * sum(ln L_ii)`
//! and the Mahalanobis term is obtained by forward substitution, so the
//! covariance is never inverted explicitly.

use crate::error::{GmmError, Result};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix1, Ix2};
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;

/// Multivariate Gaussian distribution with a cached Cholesky factor
#[derive(Debug, Clone)]
pub struct MultivariateGaussian {
    /// Mean vector
    pub mean: Array1<f64>,
    /// Covariance matrix
    pub covariance: Array2<f64>,
    /// Lower-triangular Cholesky factor of the covariance
    cholesky: Array2<f64>,
    /// Log normalizing constant: -0.5 * (D ln(2 pi) + ln|Sigma|)
    log_norm: f64,
}

impl MultivariateGaussian {
    /// Create a Gaussian, failing if the covariance is not positive-definite
    pub fn new(mean: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        let d = mean.len();
        if covariance.dim() != (d, d) {
            return Err(GmmError::InvalidInputShape(format!(
                "covariance is {:?}, expected ({}, {})",
                covariance.dim(),
                d,
                d
            )));
        }

        let cholesky =
            cholesky(&covariance).ok_or(GmmError::SingularCovariance { component: None })?;
        let log_det: f64 = 2.0 * cholesky.diag().iter().map(|l| l.ln()).sum::<f64>();
        let log_norm = -0.5 * (d as f64 * (2.0 * PI).ln() + log_det);

        Ok(Self {
            mean,
            covariance,
            cholesky,
            log_norm,
        })
    }

    /// Create with identity covariance
    pub fn with_identity(mean: Array1<f64>) -> Self {
        let d = mean.len();
        Self {
            mean,
            covariance: Array2::eye(d),
            cholesky: Array2::eye(d),
            log_norm: -0.5 * d as f64 * (2.0 * PI).ln(),
        }
    }

    /// Dimension of the distribution
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Log-determinant of the covariance
    pub fn log_det(&self) -> f64 {
        -2.0 * self.log_norm - self.dim() as f64 * (2.0 * PI).ln()
    }

    /// Squared Mahalanobis distance of a point from the mean
    pub fn mahalanobis_sq(&self, x: ArrayView1<'_, f64>) -> f64 {
        let d = self.dim();
        // Solve L y = (x - mu); then (x - mu)' Sigma^-1 (x - mu) = y'y
        let mut y = Array1::<f64>::zeros(d);
        for i in 0..d {
            let mut acc = x[i] - self.mean[i];
            for j in 0..i {
                acc -= self.cholesky[[i, j]] * y[j];
            }
            y[i] = acc / self.cholesky[[i, i]];
        }
        y.dot(&y)
    }

    /// Log probability density at a point
    pub fn log_pdf(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.log_norm - 0.5 * self.mahalanobis_sq(x)
    }

    /// Probability density at a point
    pub fn pdf(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.log_pdf(x).exp()
    }

    /// Log densities for every row of `points`
    pub fn log_pdf_batch<S: Data<Elem = f64>>(
        &self,
        points: &ArrayBase<S, Ix2>,
    ) -> Result<Array1<f64>> {
        if points.ncols() != self.dim() {
            return Err(GmmError::InvalidInputShape(format!(
                "points have {} features, distribution has {}",
                points.ncols(),
                self.dim()
            )));
        }
        Ok(points.rows().into_iter().map(|x| self.log_pdf(x)).collect())
    }

    /// Densities for every row of `points`
    pub fn pdf_batch<S: Data<Elem = f64>>(&self, points: &ArrayBase<S, Ix2>) -> Result<Array1<f64>> {
        Ok(self.log_pdf_batch(points)?.mapv_into(f64::exp))
    }

    /// Draw a sample: `x = mu + L z`, `z ~ N(0, I)`
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Array1<f64> {
        let z: Array1<f64> = (0..self.dim())
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();
        &self.mean + &self.cholesky.dot(&z)
    }
}

/// Multivariate normal density at each row of `points`
///
/// Fails with `SingularCovariance` when the covariance is not
/// positive-definite.
pub fn density<S, T, U>(
    points: &ArrayBase<S, Ix2>,
    mean: &ArrayBase<T, Ix1>,
    covariance: &ArrayBase<U, Ix2>,
) -> Result<Array1<f64>>
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
    U: Data<Elem = f64>,
{
    MultivariateGaussian::new(mean.to_owned(), covariance.to_owned())?.pdf_batch(points)
}

/// Log of [`density`]
pub fn log_density<S, T, U>(
    points: &ArrayBase<S, Ix2>,
    mean: &ArrayBase<T, Ix1>,
    covariance: &ArrayBase<U, Ix2>,
) -> Result<Array1<f64>>
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
    U: Data<Elem = f64>,
{
    MultivariateGaussian::new(mean.to_owned(), covariance.to_owned())?.log_pdf_batch(points)
}

/// Cholesky factorization of a symmetric positive-definite matrix
///
/// Returns `None` if a pivot is non-positive or not finite.
pub fn cholesky<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return None;
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}
