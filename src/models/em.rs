//! EM driver for Gaussian mixtures

use super::expectation::{expectation, ResponsibilityMatrix, UnderflowPolicy};
use super::init::Initializer;
use super::maximization::{maximization, MaximizationOptions};
use super::params::ComponentSet;
use super::trace::LikelihoodTrace;
use crate::data::DataMatrix;
use crate::error::{GmmError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How much the driver reports through `tracing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// No events
    Quiet,
    /// Start and finish at info level, iterations at debug level
    #[default]
    Summary,
    /// Every iteration at info level
    Iterations,
}

/// EM configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EmConfig {
    /// Number of mixture components (K)
    pub n_components: usize,
    /// Number of E/M alternations
    pub n_iter: usize,
    /// Stop early once the log-likelihood changes by less than this
    pub tol: Option<f64>,
    /// Diagonal regularization added by every M-step
    pub reg_covar: f64,
    /// Effective sample count treated as a collapsed component
    pub collapse_threshold: f64,
    /// Handling of samples with zero mixture density
    pub underflow: UnderflowPolicy,
    pub verbosity: Verbosity,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            n_components: 3,
            n_iter: 100,
            tol: None,
            reg_covar: 0.0,
            collapse_threshold: MaximizationOptions::default().collapse_threshold,
            underflow: UnderflowPolicy::Fail,
            verbosity: Verbosity::Summary,
        }
    }
}

impl EmConfig {
    pub fn new(n_components: usize, n_iter: usize) -> Self {
        Self {
            n_components,
            n_iter,
            ..Default::default()
        }
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = Some(tol);
        self
    }

    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.reg_covar = reg_covar;
        self
    }

    pub fn with_underflow(mut self, underflow: UnderflowPolicy) -> Self {
        self.underflow = underflow;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    fn maximization_options(&self) -> MaximizationOptions {
        MaximizationOptions {
            reg_covar: self.reg_covar,
            collapse_threshold: self.collapse_threshold,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.n_components < 2 {
            return Err(GmmError::InvalidInputShape(format!(
                "need at least 2 components, got {}",
                self.n_components
            )));
        }
        if self.n_iter == 0 {
            return Err(GmmError::InvalidParameters(
                "iteration count must be positive".to_string(),
            ));
        }
        if let Some(tol) = self.tol {
            if tol.is_nan() || tol < 0.0 {
                return Err(GmmError::InvalidParameters(format!(
                    "tolerance must be non-negative, got {}",
                    tol
                )));
            }
        }
        Ok(())
    }
}

/// A successfully fitted mixture
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Final parameters
    pub components: ComponentSet,
    /// One log-likelihood per completed E-step
    pub trace: LikelihoodTrace,
    /// `N_k` from the last M-step
    pub effective_counts: Array1<f64>,
    /// Number of E/M alternations performed
    pub n_iter: usize,
    /// Whether early stopping triggered
    pub converged: bool,
    underflow: UnderflowPolicy,
}

impl FitResult {
    /// Responsibilities of new data under the fitted parameters
    pub fn predict_proba(&self, data: &DataMatrix) -> Result<ResponsibilityMatrix> {
        expectation(data, &self.components, self.underflow).map(|(gamma, _)| gamma)
    }

    /// Most probable component for each sample
    pub fn predict(&self, data: &DataMatrix) -> Result<Vec<usize>> {
        Ok(self.predict_proba(data)?.hard_labels())
    }

    /// Total log-likelihood of data under the fitted parameters
    pub fn score(&self, data: &DataMatrix) -> Result<f64> {
        expectation(data, &self.components, self.underflow).map(|(_, ll)| ll)
    }

    /// Final log-likelihood recorded during fitting
    pub fn final_log_likelihood(&self) -> Option<f64> {
        self.trace.last()
    }
}

/// A fit that stopped on an error
#[derive(Debug, Error)]
#[error("EM aborted at iteration {iteration} with {} log-likelihood values recorded: {source}", .trace.len())]
pub struct FitFailure {
    /// The error that stopped the run
    pub source: GmmError,
    /// Log-likelihoods recorded before the failure
    pub trace: LikelihoodTrace,
    /// Iteration (0-based) in which the error occurred; equals the number
    /// of completed iterations when the final parameters are singular
    pub iteration: usize,
}

impl FitFailure {
    fn at_entry(source: GmmError) -> Self {
        Self {
            source,
            trace: LikelihoodTrace::new(),
            iteration: 0,
        }
    }
}

/// Gaussian mixture fitted by Expectation-Maximization
#[derive(Debug, Clone, Default)]
pub struct GaussianMixture {
    pub config: EmConfig,
}

impl GaussianMixture {
    pub fn new(config: EmConfig) -> Self {
        Self { config }
    }

    /// Initialize parameters and run EM
    pub fn fit<I: Initializer + ?Sized>(
        &self,
        data: &DataMatrix,
        initializer: &mut I,
    ) -> std::result::Result<FitResult, FitFailure> {
        self.config.validate().map_err(FitFailure::at_entry)?;
        let initial = initializer
            .initialize(data, self.config.n_components)
            .map_err(FitFailure::at_entry)?;
        if self.config.verbosity != Verbosity::Quiet {
            tracing::debug!("Initial means:\n{}", initial.means());
        }
        self.fit_from(data, initial)
    }

    /// Run EM from the given starting parameters
    pub fn fit_from(
        &self,
        data: &DataMatrix,
        initial: ComponentSet,
    ) -> std::result::Result<FitResult, FitFailure> {
        let config = &self.config;
        config.validate().map_err(FitFailure::at_entry)?;
        if initial.n_components() != config.n_components {
            return Err(FitFailure::at_entry(GmmError::InvalidInputShape(format!(
                "initial parameters have {} components, configured for {}",
                initial.n_components(),
                config.n_components
            ))));
        }
        if initial.dim() != data.n_features() {
            return Err(FitFailure::at_entry(GmmError::InvalidInputShape(format!(
                "initial parameters have dimension {}, data has {} features",
                initial.dim(),
                data.n_features()
            ))));
        }

        if config.verbosity != Verbosity::Quiet {
            tracing::info!(
                "Fitting {}-component mixture to {} samples x {} features ({} iterations)",
                config.n_components,
                data.n_samples(),
                data.n_features(),
                config.n_iter
            );
        }

        let options = config.maximization_options();
        let mut components = initial;
        let mut trace = LikelihoodTrace::with_capacity(config.n_iter);
        let mut effective_counts = Array1::zeros(config.n_components);
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..config.n_iter {
            let fail = |source: GmmError, trace: &LikelihoodTrace| FitFailure {
                source,
                trace: trace.clone(),
                iteration: iter,
            };

            let (gamma, log_likelihood) =
                expectation(data, &components, config.underflow).map_err(|e| fail(e, &trace))?;
            trace.push(log_likelihood);
            if gamma.n_floored() > 0 && config.verbosity != Verbosity::Quiet {
                tracing::warn!(
                    "Iteration {}: {} of {} samples had zero mixture density; clamped to floor",
                    iter + 1,
                    gamma.n_floored(),
                    data.n_samples()
                );
            }

            let step = maximization(data, &gamma, options).map_err(|e| fail(e, &trace))?;
            components = step.components;
            effective_counts = step.effective_counts;
            iterations = iter + 1;

            let delta = trace.last_delta();
            match config.verbosity {
                Verbosity::Iterations => tracing::info!(
                    "Iteration {}: log-likelihood = {:.6}, delta = {:.3e}",
                    iterations,
                    log_likelihood,
                    delta.unwrap_or(f64::NAN)
                ),
                Verbosity::Summary => tracing::debug!(
                    "Iteration {}: log-likelihood = {:.6}",
                    iterations,
                    log_likelihood
                ),
                Verbosity::Quiet => {}
            }

            if let Some(tol) = config.tol {
                if trace.has_converged(tol) {
                    converged = true;
                    break;
                }
            }
        }

        // The last M-step output has not been factorized by an E-step yet
        components.distributions().map_err(|source| FitFailure {
            source,
            trace: trace.clone(),
            iteration: iterations,
        })?;

        if config.verbosity != Verbosity::Quiet {
            match trace.last() {
                Some(ll) if converged => tracing::info!(
                    "Converged after {} iterations, log-likelihood = {:.6}",
                    iterations,
                    ll
                ),
                Some(ll) => tracing::info!(
                    "Finished {} iterations, log-likelihood = {:.6}",
                    iterations,
                    ll
                ),
                None => {}
            }
        }

        Ok(FitResult {
            components,
            trace,
            effective_counts,
            n_iter: iterations,
            converged,
            underflow: config.underflow,
        })
    }
}
