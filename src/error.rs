//! Error types for mixture model fitting

use thiserror::Error;

/// Errors raised while loading data or running EM
#[derive(Error, Debug)]
pub enum GmmError {
    /// Too few samples or components, or mismatched dimensions
    #[error("Invalid input shape: {0}")]
    InvalidInputShape(String),

    /// Covariance is not positive-definite, so the density is undefined
    #[error("Singular covariance matrix{}", component_suffix(.component))]
    SingularCovariance { component: Option<usize> },

    /// Every component assigned zero density to a sample
    #[error("Numerical underflow: total responsibility of sample {sample} is zero")]
    NumericalUnderflow { sample: usize },

    /// A component lost all of its responsibility mass
    #[error("Component {component} collapsed (effective sample count {effective_count:e})")]
    ComponentCollapse { component: usize, effective_count: f64 },

    /// Parameters violate a structural invariant
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

fn component_suffix(component: &Option<usize>) -> String {
    match component {
        Some(k) => format!(" for component {}", k),
        None => String::new(),
    }
}

impl GmmError {
    /// Attach a component index to a singular covariance error
    pub fn for_component(self, k: usize) -> Self {
        match self {
            GmmError::SingularCovariance { component: None } => {
                GmmError::SingularCovariance { component: Some(k) }
            }
            other => other,
        }
    }

    /// Whether the error came from the numerics rather than from bad input
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            GmmError::SingularCovariance { .. }
                | GmmError::NumericalUnderflow { .. }
                | GmmError::ComponentCollapse { .. }
        )
    }
}

/// Result type for mixture model operations
pub type Result<T> = std::result::Result<T, GmmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_component_fills_index() {
        let err = GmmError::SingularCovariance { component: None }.for_component(2);
        assert!(matches!(
            err,
            GmmError::SingularCovariance { component: Some(2) }
        ));
        assert_eq!(err.to_string(), "Singular covariance matrix for component 2");
    }

    #[test]
    fn test_for_component_keeps_other_errors() {
        let err = GmmError::NumericalUnderflow { sample: 7 }.for_component(1);
        assert!(matches!(err, GmmError::NumericalUnderflow { sample: 7 }));
    }

    #[test]
    fn test_is_numerical() {
        assert!(GmmError::ComponentCollapse {
            component: 0,
            effective_count: 0.0
        }
        .is_numerical());
        assert!(!GmmError::InvalidInputShape("n".into()).is_numerical());
    }
}
