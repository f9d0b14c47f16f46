//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - generates the synthetic dataset
//! - runs the computation through the storage collaborator
//! - prints the report
//! - writes optional exports

use clap::Parser;

use crate::cli::{Cli, Command, ComputeArgs};
use crate::data::SyntheticConfig;
use crate::domain::{BandFilter, EngineTuning, TpaComputationParams, TruncationSpec};
use crate::error::TpaError;

pub mod pipeline;

/// Entry point for the `tpa` binary.
pub fn run() -> Result<(), TpaError> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Compute(args) => handle_compute(args, OutputMode::Full),
        Command::Kpis(args) => handle_compute(args, OutputMode::KpisOnly),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    KpisOnly,
}

fn handle_compute(args: ComputeArgs, mode: OutputMode) -> Result<(), TpaError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_compute(&config)?;

    match mode {
        OutputMode::Full => {
            println!("{}", crate::report::format_result_summary(&run.result));
        }
        OutputMode::KpisOnly => {
            println!("{}", crate::report::format_kpis(&run.result.kpis));
        }
    }

    if let Some(path) = &args.export_json {
        crate::io::write_result_json(path, &run.result)?;
    }
    if let Some(path) = &args.export_csv {
        crate::io::write_contributions_csv(path, &run.result)?;
    }

    Ok(())
}

fn run_config_from_args(args: &ComputeArgs) -> Result<pipeline::RunConfig, TpaError> {
    let truncation = match (args.percentage, args.energy) {
        (Some(pct), None) => TruncationSpec::Percentage(pct),
        (None, Some(threshold)) => TruncationSpec::Energy(threshold),
        (None, None) => TruncationSpec::Percentage(100.0),
        (Some(_), Some(_)) => {
            return Err(TpaError::Config(
                "--percentage and --energy are mutually exclusive".to_string(),
            ));
        }
    };

    let frequency_band = match (args.band_min, args.band_max) {
        (Some(min_hz), Some(max_hz)) => Some(BandFilter { min_hz, max_hz }),
        (None, None) => None,
        _ => {
            return Err(TpaError::Config(
                "a band filter needs both --band-min and --band-max".to_string(),
            ));
        }
    };

    let tuning = EngineTuning {
        condition_threshold: args.condition_threshold,
        ..EngineTuning::default()
    };

    let params = TpaComputationParams {
        frequency_band,
        target: args.target.clone(),
        truncation,
        tuning,
    };
    // Validate up front so bad arguments exit with a config error before any
    // generation work.
    params.validate()?;

    Ok(pipeline::RunConfig {
        synthetic: SyntheticConfig {
            paths: args.paths,
            targets: args.targets,
            bins: args.bins,
            freq_min_hz: args.freq_min,
            freq_max_hz: args.freq_max,
            seed: args.seed,
            noise: args.noise,
        },
        params,
    })
}
