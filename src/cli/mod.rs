//! Command-line parsing for the TPA engine demo binary.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the numerical code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tpa", version, about = "Transfer Path Analysis computation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a TPA computation on a synthetic dataset and print the full
    /// report (KPIs, contributions, diagnostics, accuracy).
    Compute(ComputeArgs),
    /// Print KPI scalars only (useful for scripting).
    Kpis(ComputeArgs),
}

/// Common options for computing.
#[derive(Debug, Parser, Clone)]
pub struct ComputeArgs {
    /// Number of transmission paths in the synthetic dataset.
    #[arg(long, default_value_t = 8)]
    pub paths: usize,

    /// Number of target channels.
    #[arg(long, default_value_t = 3)]
    pub targets: usize,

    /// Number of frequency bins (log-spaced).
    #[arg(long, default_value_t = 64)]
    pub bins: usize,

    /// Lowest grid frequency (Hz).
    #[arg(long, default_value_t = 20.0)]
    pub freq_min: f64,

    /// Highest grid frequency (Hz).
    #[arg(long, default_value_t = 8000.0)]
    pub freq_max: f64,

    /// Random seed for dataset generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Relative measurement noise in the synthetic operational data.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Truncation as a percentage of singular values to retain (0, 100].
    #[arg(long, conflicts_with = "energy")]
    pub percentage: Option<f64>,

    /// Truncation as an energy-capture threshold (0, 1].
    #[arg(long)]
    pub energy: Option<f64>,

    /// Restrict the analysis band: lowest frequency (Hz). Requires
    /// --band-max.
    #[arg(long, requires = "band_max")]
    pub band_min: Option<f64>,

    /// Restrict the analysis band: highest frequency (Hz). Requires
    /// --band-min.
    #[arg(long, requires = "band_min")]
    pub band_max: Option<f64>,

    /// Restrict to a single target channel by name (e.g. "Driver's Ear").
    #[arg(long)]
    pub target: Option<String>,

    /// Condition-number threshold separating Good from Poor inversions.
    #[arg(long, default_value_t = 15.0)]
    pub condition_threshold: f64,

    /// Export the full result as JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export per-path contributions as CSV.
    #[arg(long)]
    pub export_csv: Option<PathBuf>,
}
