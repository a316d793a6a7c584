//! Starting parameters for EM
//!
//! Randomness is always drawn from a generator owned by the initializer,
//! seeded explicitly, so fits are reproducible.

use super::params::{Component, ComponentSet};
use crate::data::DataMatrix;
use crate::error::{GmmError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Supplies the ComponentSet that EM starts from
pub trait Initializer {
    fn initialize(&mut self, data: &DataMatrix, n_components: usize) -> Result<ComponentSet>;
}

/// How random means are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStrategy {
    /// Uniformly inside the per-feature [min, max] box of the data
    #[default]
    Range,
    /// At K distinct samples chosen at random
    Samples,
}

/// Random means, identity covariances, uniform weights
#[derive(Debug, Clone)]
pub struct RandomInitializer {
    rng: StdRng,
    strategy: InitStrategy,
}

impl RandomInitializer {
    /// Seeded initializer using the range strategy
    pub fn new(seed: u64) -> Self {
        Self::with_strategy(seed, InitStrategy::Range)
    }

    pub fn with_strategy(seed: u64, strategy: InitStrategy) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            strategy,
        }
    }

    /// Initializer seeded from the operating system
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            strategy: InitStrategy::Range,
        }
    }

    fn range_means(&mut self, data: &DataMatrix, k: usize) -> Vec<Array1<f64>> {
        let min = data.column_min();
        let max = data.column_max();
        (0..k)
            .map(|_| {
                min.iter()
                    .zip(max.iter())
                    .map(|(&lo, &hi)| self.rng.gen_range(lo..=hi))
                    .collect()
            })
            .collect()
    }

    fn sample_means(&mut self, data: &DataMatrix, k: usize) -> Result<Vec<Array1<f64>>> {
        if k > data.n_samples() {
            return Err(GmmError::InvalidInputShape(format!(
                "cannot pick {} distinct samples out of {}",
                k,
                data.n_samples()
            )));
        }
        Ok(sample(&mut self.rng, data.n_samples(), k)
            .into_iter()
            .map(|i| data.row(i).to_owned())
            .collect())
    }
}

impl Initializer for RandomInitializer {
    fn initialize(&mut self, data: &DataMatrix, n_components: usize) -> Result<ComponentSet> {
        if n_components < 2 {
            return Err(GmmError::InvalidInputShape(format!(
                "need at least 2 components, got {}",
                n_components
            )));
        }

        let means = match self.strategy {
            InitStrategy::Range => self.range_means(data, n_components),
            InitStrategy::Samples => self.sample_means(data, n_components)?,
        };

        let d = data.n_features();
        let weight = 1.0 / n_components as f64;
        let components = means
            .into_iter()
            .map(|mean| Component::new(mean, Array2::eye(d), weight))
            .collect();

        ComponentSet::new(components)
    }
}

/// Starts from a caller-supplied ComponentSet
#[derive(Debug, Clone)]
pub struct FixedInitializer {
    components: ComponentSet,
}

impl FixedInitializer {
    pub fn new(components: ComponentSet) -> Self {
        Self { components }
    }
}

impl Initializer for FixedInitializer {
    fn initialize(&mut self, data: &DataMatrix, n_components: usize) -> Result<ComponentSet> {
        if self.components.n_components() != n_components {
            return Err(GmmError::InvalidInputShape(format!(
                "fixed initializer has {} components, {} requested",
                self.components.n_components(),
                n_components
            )));
        }
        if self.components.dim() != data.n_features() {
            return Err(GmmError::InvalidInputShape(format!(
                "fixed initializer has dimension {}, data has {} features",
                self.components.dim(),
                data.n_features()
            )));
        }
        Ok(self.components.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    fn sample_data() -> DataMatrix {
        DataMatrix::new(arr2(&[[0.0, 10.0], [1.0, 20.0], [0.5, 15.0], [0.2, 12.0]])).unwrap()
    }

    #[test]
    fn test_range_initialization() {
        let data = sample_data();
        let set = RandomInitializer::new(42).initialize(&data, 3).unwrap();

        assert_eq!(set.n_components(), 3);
        for c in set.iter() {
            assert!(c.mean[0] >= 0.0 && c.mean[0] <= 1.0);
            assert!(c.mean[1] >= 10.0 && c.mean[1] <= 20.0);
            assert_eq!(c.covariance, Array2::<f64>::eye(2));
            assert_abs_diff_eq!(c.weight, 1.0 / 3.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_sample_initialization_uses_rows() {
        let data = sample_data();
        let set = RandomInitializer::with_strategy(1, InitStrategy::Samples)
            .initialize(&data, 2)
            .unwrap();
        for c in set.iter() {
            assert!(data.view().rows().into_iter().any(|row| row == c.mean));
        }
        assert_ne!(set.components()[0].mean, set.components()[1].mean);
    }

    #[test]
    fn test_too_many_sample_means() {
        let err = RandomInitializer::with_strategy(1, InitStrategy::Samples)
            .initialize(&sample_data(), 5)
            .unwrap_err();
        assert!(matches!(err, GmmError::InvalidInputShape(_)));
    }

    #[test]
    fn test_seed_reproducible() {
        let data = sample_data();
        let a = RandomInitializer::new(7).initialize(&data, 2).unwrap();
        let b = RandomInitializer::new(7).initialize(&data, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_component_rejected() {
        let err = RandomInitializer::new(0)
            .initialize(&sample_data(), 1)
            .unwrap_err();
        assert!(matches!(err, GmmError::InvalidInputShape(_)));
    }

    #[test]
    fn test_fixed_initializer_checks_shape() {
        let data = sample_data();
        let set = RandomInitializer::new(3).initialize(&data, 2).unwrap();
        let mut fixed = FixedInitializer::new(set.clone());

        assert_eq!(fixed.initialize(&data, 2).unwrap(), set);
        assert!(fixed.initialize(&data, 3).is_err());
    }
}
