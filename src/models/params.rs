//! Mixture parameters

use super::gaussian::MultivariateGaussian;
use crate::error::{GmmError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Tolerance on the sum of mixing weights
pub const WEIGHT_SUM_TOL: f64 = 1e-6;

/// Tolerance on covariance asymmetry, relative to its largest entry
const SYMMETRY_TOL: f64 = 1e-9;

/// A single Gaussian component of the mixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Mean vector (length D)
    pub mean: Array1<f64>,
    /// Covariance matrix (D x D)
    pub covariance: Array2<f64>,
    /// Mixing proportion
    pub weight: f64,
}

impl Component {
    pub fn new(mean: Array1<f64>, covariance: Array2<f64>, weight: f64) -> Self {
        Self {
            mean,
            covariance,
            weight,
        }
    }

    /// Density evaluator for this component
    pub fn distribution(&self) -> Result<MultivariateGaussian> {
        MultivariateGaussian::new(self.mean.clone(), self.covariance.clone())
    }
}

/// The K components of a mixture
///
/// Always holds at least two components of a common dimension, with
/// symmetric covariances and weights in [0, 1] summing to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Component>", into = "Vec<Component>")]
pub struct ComponentSet {
    components: Vec<Component>,
}

impl ComponentSet {
    /// Validate and wrap a list of components
    pub fn new(components: Vec<Component>) -> Result<Self> {
        if components.len() < 2 {
            return Err(GmmError::InvalidInputShape(format!(
                "need at least 2 components, got {}",
                components.len()
            )));
        }

        let d = components[0].mean.len();
        if d == 0 {
            return Err(GmmError::InvalidInputShape(
                "component means must have at least one feature".to_string(),
            ));
        }

        for (k, c) in components.iter().enumerate() {
            if c.mean.len() != d {
                return Err(GmmError::InvalidInputShape(format!(
                    "component {} has mean of length {}, expected {}",
                    k,
                    c.mean.len(),
                    d
                )));
            }
            if c.covariance.dim() != (d, d) {
                return Err(GmmError::InvalidInputShape(format!(
                    "component {} has covariance of shape {:?}, expected ({}, {})",
                    k,
                    c.covariance.dim(),
                    d,
                    d
                )));
            }
            if !is_symmetric(&c.covariance) {
                return Err(GmmError::InvalidParameters(format!(
                    "covariance of component {} is not symmetric",
                    k
                )));
            }
            if !(0.0..=1.0).contains(&c.weight) {
                return Err(GmmError::InvalidParameters(format!(
                    "weight of component {} is {}, outside [0, 1]",
                    k, c.weight
                )));
            }
        }

        let total: f64 = components.iter().map(|c| c.weight).sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOL {
            return Err(GmmError::InvalidParameters(format!(
                "mixing weights sum to {}, expected 1",
                total
            )));
        }

        Ok(Self { components })
    }

    /// Number of components (K)
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Dimension of each component (D)
    pub fn dim(&self) -> usize {
        self.components[0].mean.len()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn get(&self, k: usize) -> Option<&Component> {
        self.components.get(k)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    /// Mixing weights as a vector
    pub fn weights(&self) -> Array1<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }

    /// Means stacked into a K x D matrix
    pub fn means(&self) -> Array2<f64> {
        let mut means = Array2::zeros((self.n_components(), self.dim()));
        for (k, c) in self.components.iter().enumerate() {
            means.row_mut(k).assign(&c.mean);
        }
        means
    }

    /// Density evaluators, one per component
    pub fn distributions(&self) -> Result<Vec<MultivariateGaussian>> {
        self.components
            .iter()
            .enumerate()
            .map(|(k, c)| c.distribution().map_err(|e| e.for_component(k)))
            .collect()
    }
}

impl TryFrom<Vec<Component>> for ComponentSet {
    type Error = GmmError;

    fn try_from(components: Vec<Component>) -> Result<Self> {
        Self::new(components)
    }
}

impl From<ComponentSet> for Vec<Component> {
    fn from(set: ComponentSet) -> Self {
        set.components
    }
}

impl<'a> IntoIterator for &'a ComponentSet {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

fn is_symmetric(m: &Array2<f64>) -> bool {
    let scale = m.iter().fold(1.0_f64, |acc, x| acc.max(x.abs()));
    let n = m.nrows();
    (0..n).all(|i| (0..i).all(|j| (m[[i, j]] - m[[j, i]]).abs() <= SYMMETRY_TOL * scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, array};

    fn two_components() -> Vec<Component> {
        vec![
            Component::new(array![0.0, 0.0], Array2::eye(2), 0.4),
            Component::new(array![1.0, 1.0], Array2::eye(2), 0.6),
        ]
    }

    #[test]
    fn test_component_set_valid() {
        let set = ComponentSet::new(two_components()).unwrap();
        assert_eq!(set.n_components(), 2);
        assert_eq!(set.dim(), 2);
        assert_eq!(set.weights().to_vec(), vec![0.4, 0.6]);
        assert_eq!(set.means(), arr2(&[[0.0, 0.0], [1.0, 1.0]]));
    }

    #[test]
    fn test_rejects_single_component() {
        let mut components = two_components();
        components.truncate(1);
        components[0].weight = 1.0;
        let err = ComponentSet::new(components).unwrap_err();
        assert!(matches!(err, GmmError::InvalidInputShape(_)));
    }

    #[test]
    fn test_rejects_bad_weight_sum() {
        let mut components = two_components();
        components[1].weight = 0.5;
        let err = ComponentSet::new(components).unwrap_err();
        assert!(matches!(err, GmmError::InvalidParameters(_)));
    }

    #[test]
    fn test_rejects_asymmetric_covariance() {
        let mut components = two_components();
        components[0].covariance = arr2(&[[1.0, 0.5], [0.0, 1.0]]);
        let err = ComponentSet::new(components).unwrap_err();
        assert!(err.to_string().contains("not symmetric"));
    }

    #[test]
    fn test_rejects_dimension_mismatch() {
        let mut components = two_components();
        components[1].mean = array![1.0, 2.0, 3.0];
        assert!(ComponentSet::new(components).is_err());
    }

    #[test]
    fn test_distributions_tag_singular_component() {
        let mut components = two_components();
        components[1].covariance = Array2::zeros((2, 2));
        let set = ComponentSet::new(components).unwrap();
        let err = set.distributions().unwrap_err();
        assert!(matches!(
            err,
            GmmError::SingularCovariance { component: Some(1) }
        ));
    }

    #[test]
    fn test_json_round_trip_validates() {
        let set = ComponentSet::new(two_components()).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        let parsed: ComponentSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);

        let bad = json.replace("0.6", "0.9");
        assert!(serde_json::from_str::<ComponentSet>(&bad).is_err());
    }
}
