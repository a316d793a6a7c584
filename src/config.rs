//! Configuration management
//!
//! Settings are read from a TOML file; every section falls back to its
//! defaults when omitted.

use crate::models::{EmConfig, InitStrategy, RandomInitializer, UnderflowPolicy, Verbosity};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Input data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file with one sample per row
    pub input: Option<PathBuf>,
    /// Whether the first CSV row is a header
    pub has_header: bool,
    /// Min-max scale each feature into [0, 1] before fitting
    pub scale: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input: None,
            has_header: true,
            scale: true,
        }
    }
}

/// EM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmSection {
    pub n_components: usize,
    pub n_iter: usize,
    /// Early-stopping threshold on the log-likelihood change
    pub tol: Option<f64>,
    pub reg_covar: f64,
    pub collapse_threshold: f64,
    /// Clamp zero mixture densities to this value instead of failing
    pub underflow_floor: Option<f64>,
    pub verbosity: Verbosity,
}

impl Default for EmSection {
    fn default() -> Self {
        let em = EmConfig::default();
        Self {
            n_components: em.n_components,
            n_iter: em.n_iter,
            tol: em.tol,
            reg_covar: em.reg_covar,
            collapse_threshold: em.collapse_threshold,
            underflow_floor: None,
            verbosity: em.verbosity,
        }
    }
}

/// Initialization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    /// Seed for the initializer; drawn from the OS when absent
    pub seed: Option<u64>,
    pub strategy: InitStrategy,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub em: EmSection,
    pub init: InitConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create default configuration file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        Config::default().save(path)
    }

    /// EM settings for the driver
    pub fn em_config(&self) -> EmConfig {
        EmConfig {
            n_components: self.em.n_components,
            n_iter: self.em.n_iter,
            tol: self.em.tol,
            reg_covar: self.em.reg_covar,
            collapse_threshold: self.em.collapse_threshold,
            underflow: match self.em.underflow_floor {
                Some(floor) => UnderflowPolicy::Floor(floor),
                None => UnderflowPolicy::Fail,
            },
            verbosity: self.em.verbosity,
        }
    }

    /// Initializer described by the `[init]` section
    pub fn initializer(&self) -> RandomInitializer {
        match self.init.seed {
            Some(seed) => RandomInitializer::with_strategy(seed, self.init.strategy),
            None => RandomInitializer::from_entropy(),
        }
    }
}
