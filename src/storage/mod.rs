//! Storage collaborator interface.
//!
//! The engine never persists state itself: a caller resolves dataset ids to
//! in-memory entities *before* invoking the engine and hands the finished
//! result back to storage afterwards. `TpaStorage` is that seam; the
//! in-memory implementation backs the demo binary and tests, and a real
//! deployment substitutes a database-backed one behind the same trait.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    FrfMatrix, OperationalVector, TpaComputationParams, TpaComputationResult,
};
use crate::engine::CancelToken;
use crate::error::TpaError;

/// Caller-supplied labeling for a saved result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub name: String,
    pub description: Option<String>,
}

/// A saved result with its storage identity.
#[derive(Debug, Clone)]
pub struct StoredResult {
    pub id: u32,
    pub metadata: ResultMetadata,
    pub result: TpaComputationResult,
}

pub trait TpaStorage {
    fn load_frf_dataset(&self, id: u32) -> Result<FrfMatrix, TpaError>;
    fn load_operational_measurement(&self, id: u32) -> Result<OperationalVector, TpaError>;
    fn save_result(
        &mut self,
        result: TpaComputationResult,
        metadata: ResultMetadata,
    ) -> Result<u32, TpaError>;
}

/// In-memory store with auto-increment ids.
#[derive(Debug, Default)]
pub struct MemStorage {
    frf_datasets: HashMap<u32, FrfMatrix>,
    operational_measurements: HashMap<u32, OperationalVector>,
    results: HashMap<u32, StoredResult>,
    next_id: u32,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn insert_frf_dataset(&mut self, frf: FrfMatrix) -> u32 {
        let id = self.allocate_id();
        self.frf_datasets.insert(id, frf);
        id
    }

    pub fn insert_operational_measurement(&mut self, operational: OperationalVector) -> u32 {
        let id = self.allocate_id();
        self.operational_measurements.insert(id, operational);
        id
    }

    pub fn get_result(&self, id: u32) -> Option<&StoredResult> {
        self.results.get(&id)
    }
}

impl TpaStorage for MemStorage {
    fn load_frf_dataset(&self, id: u32) -> Result<FrfMatrix, TpaError> {
        self.frf_datasets
            .get(&id)
            .cloned()
            .ok_or_else(|| TpaError::Storage(format!("FRF dataset {id} not found")))
    }

    fn load_operational_measurement(&self, id: u32) -> Result<OperationalVector, TpaError> {
        self.operational_measurements
            .get(&id)
            .cloned()
            .ok_or_else(|| TpaError::Storage(format!("operational measurement {id} not found")))
    }

    fn save_result(
        &mut self,
        result: TpaComputationResult,
        metadata: ResultMetadata,
    ) -> Result<u32, TpaError> {
        let id = self.allocate_id();
        self.results.insert(
            id,
            StoredResult {
                id,
                metadata,
                result,
            },
        );
        Ok(id)
    }
}

/// Load both inputs, run the engine, and persist the result.
///
/// Loading happens strictly before invocation, so the engine itself stays
/// free of blocking I/O.
pub fn run_with_storage<S: TpaStorage>(
    storage: &mut S,
    frf_id: u32,
    operational_id: u32,
    params: &TpaComputationParams,
    metadata: ResultMetadata,
    cancel: &CancelToken,
) -> Result<u32, TpaError> {
    let frf = storage.load_frf_dataset(frf_id)?;
    let operational = storage.load_operational_measurement(operational_id)?;
    let result = crate::engine::compute(&frf, &operational, params, cancel)?;
    storage.save_result(result, metadata)
}
