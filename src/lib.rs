//! # GMM-EM - Gaussian Mixture clustering with Expectation-Maximization
//!
//! Fits a mixture of full-covariance Gaussians to unlabeled data and
//! returns soft cluster assignments together with the per-iteration
//! log-likelihood.
//!
//! ## Modules
//!
//! - `data` - Sample matrices, CSV ingestion, min-max scaling, synthetic blobs
//! - `models` - Gaussian density, E-step, M-step, initialization and the EM driver
//! - `config` - TOML configuration
//! - `report` - Text summaries and JSON export
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gmm_em::prelude::*;
//!
//! let (data, _) = three_blobs(100, 42)?;
//! let gmm = GaussianMixture::new(EmConfig::new(3, 100));
//! let fit = gmm.fit(&data, &mut RandomInitializer::new(7))?;
//! let labels = fit.predict(&data)?;
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod report;

pub use config::Config;
pub use data::DataMatrix;
pub use error::{GmmError, Result};
pub use models::{
    ComponentSet, EmConfig, FitFailure, FitResult, GaussianMixture, LikelihoodTrace,
    ResponsibilityMatrix,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::data::{load_csv, min_max_scale, three_blobs, DataMatrix, MinMaxScaler};
    pub use crate::error::{GmmError, Result};
    pub use crate::models::{
        expectation, maximization, Component, ComponentSet, EmConfig, FitFailure, FitResult,
        GaussianMixture, Initializer, LikelihoodTrace, RandomInitializer, ResponsibilityMatrix,
        UnderflowPolicy, Verbosity,
    };
}
