//! Text summaries and JSON export of fitted mixtures

use crate::models::{ComponentSet, FitResult, LikelihoodTrace, ResponsibilityMatrix};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable snapshot of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExport {
    pub components: ComponentSet,
    pub log_likelihood: LikelihoodTrace,
    pub n_iter: usize,
    pub converged: bool,
    /// Samples assigned to each component by arg-max
    pub cluster_sizes: Vec<usize>,
}

impl ModelExport {
    pub fn new(fit: &FitResult, responsibilities: &ResponsibilityMatrix) -> Self {
        Self {
            components: fit.components.clone(),
            log_likelihood: fit.trace.clone(),
            n_iter: fit.n_iter,
            converged: fit.converged,
            cluster_sizes: responsibilities.cluster_sizes(),
        }
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Print fitted parameters, cluster sizes and the likelihood trace
pub fn print_summary(fit: &FitResult, responsibilities: &ResponsibilityMatrix) {
    println!("\n{}", "=== Mixture Components ===".bold());
    let sizes = responsibilities.cluster_sizes();
    for (k, component) in fit.components.iter().enumerate() {
        println!(
            "  Component {}: weight = {:.4}, N_k = {:.2}, points = {}",
            k,
            component.weight,
            fit.effective_counts[k],
            sizes[k]
        );
        let mean: Vec<String> = component.mean.iter().map(|v| format!("{:.4}", v)).collect();
        println!("    mean: [{}]", mean.join(", "));
        for (i, row) in component.covariance.rows().into_iter().enumerate() {
            let label = if i == 0 { "cov: " } else { "     " };
            let values: Vec<String> = row.iter().map(|v| format!("{:>9.4}", v)).collect();
            println!("    {}[{}]", label, values.join(" "));
        }
    }

    print_trace(&fit.trace);

    let status = if fit.converged {
        format!("converged after {} iterations", fit.n_iter).green()
    } else {
        format!("ran {} iterations", fit.n_iter).yellow()
    };
    println!("\n  Status: {}", status);
}

/// Print the log-likelihood at a handful of evenly spaced iterations
pub fn print_trace(trace: &LikelihoodTrace) {
    println!("\n{}", "=== Log-likelihood ===".bold());
    let values = trace.values();
    if values.is_empty() {
        println!("  (empty)");
        return;
    }

    let step = (values.len() / 10).max(1);
    for (i, value) in values.iter().enumerate() {
        if i % step == 0 || i + 1 == values.len() {
            println!("  iter {:>4}: {:.6}", i + 1, value);
        }
    }
    if let Some(delta) = trace.last_delta() {
        println!("  last delta: {:.3e}", delta);
    }
}
