//! Shared compute-pipeline logic for the CLI front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! dataset generation -> storage insert -> load/compute/save -> result
//!
//! The CLI can then focus on presentation (printing and exports), and the
//! same pipeline is reusable by a future service front-end.

use crate::data::{SyntheticConfig, generate_dataset};
use crate::domain::{TpaComputationParams, TpaComputationResult};
use crate::engine::CancelToken;
use crate::error::TpaError;
use crate::storage::{MemStorage, ResultMetadata, run_with_storage};

/// A full run's configuration as understood by the pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub synthetic: SyntheticConfig,
    pub params: TpaComputationParams,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub result: TpaComputationResult,
    pub result_id: u32,
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_compute(config: &RunConfig) -> Result<RunOutput, TpaError> {
    log::info!(
        "generating synthetic dataset: {} paths x {} targets x {} bins",
        config.synthetic.paths,
        config.synthetic.targets,
        config.synthetic.bins
    );
    let dataset = generate_dataset(&config.synthetic)?;

    let mut storage = MemStorage::new();
    let frf_id = storage.insert_frf_dataset(dataset.frf);
    let operational_id = storage.insert_operational_measurement(dataset.operational);

    log::info!("running TPA computation (frf={frf_id}, operational={operational_id})");
    let result_id = run_with_storage(
        &mut storage,
        frf_id,
        operational_id,
        &config.params,
        ResultMetadata {
            name: format!("synthetic run (seed {})", config.synthetic.seed),
            description: None,
        },
        &CancelToken::new(),
    )?;

    let stored = storage
        .get_result(result_id)
        .ok_or_else(|| TpaError::Storage(format!("result {result_id} vanished after save")))?;
    log::info!("saved result {result_id}");

    Ok(RunOutput {
        result: stored.result.clone(),
        result_id,
    })
}
