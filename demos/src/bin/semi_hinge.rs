//! Semi-supervised hinge loss driver
//!
//! ## Usage
//!
//! ```bash
//! # Compare evaluators and check gradients numerically
//! cargo run --bin semi_hinge -- check --probes 32
//!
//! # Fit random embeddings for 500 steps
//! cargo run --bin semi_hinge -- fit --steps 500
//!
//! # Show backend and configuration
//! cargo run --bin semi_hinge -- info --config demo.json
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use semi_hinge_demos::{
    create_device, get_backend_name, run_check, run_fit, DemoConfig, SelectedBackend,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "semi_hinge")]
#[command(about = "Semi-supervised pairwise hinge loss: gradient checks and toy fitting")]
struct Cli {
    /// Configuration file path (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare the evaluators and run a finite-difference gradient check
    Check {
        /// Number of coordinates to probe
        #[arg(long, default_value_t = 16)]
        probes: usize,
    },

    /// Run gradient descent on random embedding pairs
    Fit {
        /// Override number of steps
        #[arg(long)]
        steps: Option<usize>,

        /// Override learning rate
        #[arg(long)]
        learning_rate: Option<f64>,
    },

    /// Show backend information and the effective configuration
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            DemoConfig::load(path)?
        }
        None => DemoConfig::default(),
    };

    let device = create_device();
    tracing::info!(backend = get_backend_name(), "using backend");

    match cli.command {
        Commands::Check { probes } => {
            ensure!(probes > 0, "probes must be positive");
            let report = run_check::<SelectedBackend>(&config, &device, probes)?;
            tracing::info!(
                sequential_loss = report.sequential_loss,
                device_loss = report.device_loss,
                max_gradient_gap = report.max_gradient_gap,
                max_numeric_error = report.max_numeric_error,
                probes = report.probes,
                supervised = report.stats.supervised,
                unsupervised = report.stats.unsupervised,
                active = report.stats.active,
                "gradient check finished"
            );
            ensure!(
                report.passed(config.fd_tolerance),
                "finite-difference error {} exceeds tolerance {}",
                report.max_numeric_error,
                config.fd_tolerance
            );
        }
        Commands::Fit {
            steps,
            learning_rate,
        } => {
            if let Some(steps) = steps {
                config.steps = steps;
            }
            if let Some(learning_rate) = learning_rate {
                config.learning_rate = learning_rate;
            }
            config.validate()?;

            tracing::info!(
                steps = config.steps,
                learning_rate = config.learning_rate,
                batch_size = config.batch.batch_size,
                "starting fit"
            );
            let report = run_fit::<SelectedBackend>(&config, &device)?;
            tracing::info!(
                initial_loss = report.initial_loss,
                final_loss = report.final_loss,
                steps = report.steps,
                "fit completed"
            );
        }
        Commands::Info => {
            println!("Backend: {}", get_backend_name());
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}
