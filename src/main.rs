//! GMM-EM CLI
//!
//! Command-line interface for fitting Gaussian mixtures to CSV data

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use gmm_em::{
    config::Config,
    data::{load_csv, min_max_scale, save_csv, save_labels, three_blobs},
    models::{GaussianMixture, RandomInitializer, UnderflowPolicy, Verbosity},
    report::{print_summary, print_trace, ModelExport},
};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gmm_em")]
#[command(about = "Gaussian Mixture Model clustering with Expectation-Maximization")]
struct Cli {
    /// Log every EM iteration
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a mixture model to a CSV file
    Fit {
        /// Input CSV file (one sample per row)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of components
        #[arg(short = 'k', long)]
        n_components: Option<usize>,

        /// Number of EM iterations
        #[arg(short = 'n', long)]
        n_iter: Option<usize>,

        /// Seed for parameter initialization
        #[arg(short, long)]
        seed: Option<u64>,

        /// Stop once the log-likelihood changes by less than this
        #[arg(long)]
        tol: Option<f64>,

        /// Clamp zero mixture densities to this floor instead of failing
        #[arg(long)]
        underflow_floor: Option<f64>,

        /// Fit on the raw values instead of min-max scaled features
        #[arg(long)]
        raw: bool,

        /// Input file has no header row
        #[arg(long)]
        no_header: bool,

        /// Write samples with their labels to this CSV file
        #[arg(long)]
        labels_out: Option<PathBuf>,

        /// Write the fitted model to this JSON file
        #[arg(long)]
        model_out: Option<PathBuf>,
    },

    /// Generate three well-separated 2-D Gaussian clusters
    Generate {
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Points per cluster
        #[arg(short, long, default_value = "100")]
        per_cluster: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },

    /// Write a default configuration file
    InitConfig {
        /// Output TOML file
        #[arg(short, long, default_value = "gmm_em.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fit {
            input,
            config,
            n_components,
            n_iter,
            seed,
            tol,
            underflow_floor,
            raw,
            no_header,
            labels_out,
            model_out,
        } => {
            let mut cfg = match config {
                Some(path) => Config::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => Config::default(),
            };
            init_logging(cli.verbose, &cfg.logging.level)?;

            if let Some(input) = input {
                cfg.data.input = Some(input);
            }
            if let Some(k) = n_components {
                cfg.em.n_components = k;
            }
            if let Some(n) = n_iter {
                cfg.em.n_iter = n;
            }
            if seed.is_some() {
                cfg.init.seed = seed;
            }
            if tol.is_some() {
                cfg.em.tol = tol;
            }
            if underflow_floor.is_some() {
                cfg.em.underflow_floor = underflow_floor;
            }
            if raw {
                cfg.data.scale = false;
            }
            if no_header {
                cfg.data.has_header = false;
            }
            if cli.verbose {
                cfg.em.verbosity = Verbosity::Iterations;
            }

            fit(&cfg, labels_out, model_out)?;
        }
        Commands::Generate {
            output,
            per_cluster,
            seed,
        } => {
            init_logging(cli.verbose, "info")?;
            generate(&output, per_cluster, seed)?;
        }
        Commands::InitConfig { output } => {
            init_logging(cli.verbose, "info")?;
            Config::create_default(&output)?;
            println!(
                "{}",
                format!("Wrote default configuration to {}", output.display()).green()
            );
        }
    }

    Ok(())
}

/// Install the subscriber; `--verbose` overrides the configured level
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let level = if verbose { "debug" } else { level };
    let directive = format!("gmm_em={}", level)
        .parse::<Directive>()
        .with_context(|| format!("invalid log level {:?}", level))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();
    Ok(())
}

fn fit(cfg: &Config, labels_out: Option<PathBuf>, model_out: Option<PathBuf>) -> Result<()> {
    let input = cfg
        .data
        .input
        .as_ref()
        .context("no input file given (use --input or [data].input)")?;

    println!("{}", "Loading data...".cyan());
    let data = load_csv(input, cfg.data.has_header)
        .with_context(|| format!("reading {}", input.display()))?;
    println!(
        "Loaded {} samples with {} features",
        data.n_samples(),
        data.n_features()
    );

    let (fit_data, scaler) = if cfg.data.scale {
        println!("{}", "Scaling features into [0, 1]...".cyan());
        let (scaled, scaler) = min_max_scale(&data)?;
        (scaled, Some(scaler))
    } else {
        (data.clone(), None)
    };

    let em = cfg.em_config();
    if let UnderflowPolicy::Floor(floor) = em.underflow {
        println!("Zero-density samples will be clamped to {:e}", floor);
    }
    println!(
        "{}",
        format!(
            "Fitting {}-component mixture ({} iterations)...",
            em.n_components, em.n_iter
        )
        .cyan()
    );

    let gmm = GaussianMixture::new(em);
    let mut initializer: RandomInitializer = cfg.initializer();
    let result = match gmm.fit(&fit_data, &mut initializer) {
        Ok(result) => result,
        Err(failure) => {
            println!("{}", format!("EM failed: {}", failure.source).red());
            if !failure.trace.is_empty() {
                print_trace(&failure.trace);
            }
            if failure.source.is_numerical() {
                println!(
                    "{}",
                    "Hint: try another --seed, set [em].reg_covar, or pass --underflow-floor"
                        .yellow()
                );
            }
            return Err(failure.into());
        }
    };

    // Final E-step for the soft and hard assignments
    let gamma = result.predict_proba(&fit_data)?;
    if gamma.n_floored() > 0 {
        println!(
            "{}",
            format!("{} samples were clamped to the underflow floor", gamma.n_floored()).yellow()
        );
    }
    print_summary(&result, &gamma);

    if let Some(scaler) = &scaler {
        println!("\n{}", "=== Means in original units ===".bold());
        for (k, component) in result.components.iter().enumerate() {
            let mean = scaler.inverse_transform_point(&component.mean);
            let values: Vec<String> = mean.iter().map(|v| format!("{:.4}", v)).collect();
            println!("  Component {}: [{}]", k, values.join(", "));
        }
    }

    if let Some(path) = labels_out {
        save_labels(&path, &data, &gamma.hard_labels(), &gamma.confidence())?;
        println!("{}", format!("Saved labels to {}", path.display()).green());
    }

    if let Some(path) = model_out {
        ModelExport::new(&result, &gamma).save_json(&path)?;
        println!("{}", format!("Saved model to {}", path.display()).green());
    }

    Ok(())
}

fn generate(output: &Path, per_cluster: usize, seed: u64) -> Result<()> {
    let (data, _) = three_blobs(per_cluster, seed)?;
    save_csv(output, &data)?;
    println!(
        "{}",
        format!(
            "Wrote {} samples from 3 clusters to {}",
            data.n_samples(),
            output.display()
        )
        .green()
    );
    Ok(())
}
