//! Log-likelihood history of a fit

use serde::{Deserialize, Serialize};

/// Append-only sequence of per-iteration log-likelihoods
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikelihoodTrace {
    values: Vec<f64>,
}

impl LikelihoodTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, log_likelihood: f64) {
        self.values.push(log_likelihood);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Successive differences `L[t] - L[t-1]`
    pub fn deltas(&self) -> Vec<f64> {
        self.values.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Most recent difference, if there are two entries
    pub fn last_delta(&self) -> Option<f64> {
        match self.values.as_slice() {
            [.., prev, last] => Some(last - prev),
            _ => None,
        }
    }

    /// True if no step decreases by more than `tol`, relative to the
    /// magnitude of the values involved
    pub fn is_non_decreasing(&self, tol: f64) -> bool {
        self.values
            .windows(2)
            .all(|w| w[1] - w[0] >= -tol * w[0].abs().max(w[1].abs()).max(1.0))
    }

    /// True if the most recent absolute change is below `tol`
    pub fn has_converged(&self, tol: f64) -> bool {
        self.last_delta().map_or(false, |d| d.abs() < tol)
    }

    /// Index of the first iteration whose change fell below `tol`
    pub fn converged_at(&self, tol: f64) -> Option<usize> {
        self.deltas().iter().position(|d| d.abs() < tol).map(|i| i + 1)
    }
}

impl From<Vec<f64>> for LikelihoodTrace {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

impl AsRef<[f64]> for LikelihoodTrace {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}
