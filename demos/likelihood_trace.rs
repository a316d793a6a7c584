//! Example: Watching the log-likelihood climb
//!
//! Fits a two-component mixture with early stopping and prints the
//! per-iteration log-likelihood, then shows how a zero-density outlier
//! is handled by the two underflow policies.
//!
//! Run with: cargo run --example likelihood_trace

use gmm_em::data::{make_blobs, DataMatrix};
use gmm_em::models::{
    expectation, Component, ComponentSet, EmConfig, GaussianMixture, UnderflowPolicy, Verbosity,
};
use ndarray::{array, concatenate, Array2, Axis};

fn main() -> anyhow::Result<()> {
    println!("=== Log-likelihood Trace ===\n");

    let centers = vec![vec![-2.0, 0.0], vec![3.0, 1.0]];
    let (data, _) = make_blobs(&centers, 0.8, 150, 3)?;

    let start = ComponentSet::new(vec![
        Component::new(array![-0.5, 0.5], Array2::eye(2), 0.5),
        Component::new(array![0.5, 0.5], Array2::eye(2), 0.5),
    ])?;

    let config = EmConfig::new(2, 200)
        .with_tol(1e-8)
        .with_verbosity(Verbosity::Quiet);
    let fit = GaussianMixture::new(config).fit_from(&data, start)?;

    println!("  iter   log-likelihood        delta");
    println!("  ──────────────────────────────────────");
    let values = fit.trace.values();
    for (i, value) in values.iter().enumerate() {
        let delta = if i == 0 { f64::NAN } else { value - values[i - 1] };
        println!("  {:>4}   {:>14.6}   {:>12.3e}", i + 1, value, delta);
    }

    println!(
        "\nMonotone: {}   converged: {}   iterations: {}",
        fit.trace.is_non_decreasing(1e-9),
        fit.converged,
        fit.n_iter
    );
    if let Some(iter) = fit.trace.converged_at(1e-4) {
        println!("Change fell below 1e-4 at iteration {}", iter + 1);
    }

    println!("\n=== Zero-density outlier ===\n");

    // Squared distance overflows, so no component assigns this point any mass
    let outlier = array![[1e200, 1e200]];
    let with_outlier = DataMatrix::new(concatenate![Axis(0), data.view(), outlier.view()])?;

    match expectation(&with_outlier, &fit.components, UnderflowPolicy::Fail) {
        Ok(_) => println!("Fail policy: responsibilities computed"),
        Err(e) => println!("Fail policy: {}", e),
    }

    let (gamma, log_likelihood) =
        expectation(&with_outlier, &fit.components, UnderflowPolicy::Floor(1e-300))?;
    let last = gamma.view().row(gamma.n_samples() - 1).to_owned();
    println!(
        "Floor policy: log-likelihood {:.4}, {} row(s) floored, outlier responsibilities {}",
        log_likelihood,
        gamma.n_floored(),
        last
    );

    Ok(())
}
