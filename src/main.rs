//! drive-privacy - Differential privacy for vehicle telemetry
//!
//! Privatizes telemetry tables with the Laplace mechanism and compares driving
//! risk scores computed from raw and privatized data.

use anyhow::Result;
use clap::{Parser, Subcommand};
use drive_privacy::{config::DrivePrivacyConfig, pipeline::Pipeline};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "drive-privacy")]
#[command(version)]
#[command(about = "Differential privacy and risk scoring for vehicle telemetry")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DRIVE_PRIVACY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Directory for outputs (defaults to the input's directory)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a privatized copy of a dataset
    Privatize {
        /// Telemetry CSV file
        dataset: PathBuf,

        /// Total privacy budget
        #[arg(short, long)]
        epsilon: f64,

        /// Seed for reproducible noise
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Write per-vehicle risk scores of a dataset
    Score {
        /// Telemetry CSV file
        dataset: PathBuf,

        /// Include per-indicator mean columns
        #[arg(long)]
        detailed: bool,
    },

    /// Privatize and score a dataset across several epsilons
    Sweep {
        /// Telemetry CSV file
        dataset: PathBuf,

        /// Epsilon values (comma separated); defaults to the configured sweep
        #[arg(short, long, value_delimiter = ',')]
        epsilons: Vec<f64>,

        /// Base seed; point i uses seed + i
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the sweep report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write per-vehicle behaviour features of a dataset
    Features {
        /// Telemetry CSV file
        dataset: PathBuf,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries output paths and reports
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("drive_privacy={}", log_level).into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    }

    let config = match &cli.config {
        Some(path) => DrivePrivacyConfig::from_file(path)?,
        None => DrivePrivacyConfig::default(),
    };

    if let Commands::Config { default } = cli.command {
        return show_config(if default { None } else { Some(&config) });
    }

    let mut pipeline = Pipeline::new(config)?;
    if let Some(dir) = cli.output_dir {
        pipeline = pipeline.with_output_dir(dir);
    }

    match cli.command {
        Commands::Privatize {
            dataset,
            epsilon,
            seed,
        } => {
            let out = pipeline.privatize(&dataset, epsilon, seed)?;
            for column in &out.report.columns {
                tracing::info!(
                    "{}: {} sensitivity={:.6} epsilon={:.4} scale={:.6} noised={}{}",
                    column.column,
                    column.strategy,
                    column.sensitivity,
                    column.epsilon,
                    column.scale,
                    column.noised_values,
                    if column.degenerate { " (degenerate)" } else { "" }
                );
            }
            println!("{}", out.output_path.display());
        }
        Commands::Score { dataset, detailed } => {
            let out = pipeline.score_risk(&dataset, detailed)?;
            println!("{}", out.output_path.display());
        }
        Commands::Sweep {
            dataset,
            epsilons,
            seed,
            json,
        } => {
            let out = pipeline.sweep(&dataset, &epsilons, seed)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&out.report)?);
            } else {
                println!("{}", out.summary_path.display());
            }
        }
        Commands::Features { dataset } => {
            let out = pipeline.features(&dataset)?;
            println!("{}", out.output_path.display());
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn show_config(config: Option<&DrivePrivacyConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
