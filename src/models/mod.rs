//! Gaussian mixture models
//!
//! Provides the multivariate Gaussian density, the E-step and M-step,
//! parameter initialization and the EM driver.

mod em;
mod expectation;
mod gaussian;
mod init;
mod maximization;
mod params;
mod trace;

pub use em::{EmConfig, FitFailure, FitResult, GaussianMixture, Verbosity};
pub use expectation::{expectation, ResponsibilityMatrix, UnderflowPolicy};
pub use gaussian::{cholesky, density, log_density, MultivariateGaussian};
pub use init::{FixedInitializer, InitStrategy, Initializer, RandomInitializer};
pub use maximization::{maximization, MaximizationOptions, MaximizationOutput};
pub use params::{Component, ComponentSet, WEIGHT_SUM_TOL};
pub use trace::LikelihoodTrace;
