//! Read/write result JSON files.
//!
//! Result JSON is the portable representation of one computation: the full
//! `TpaComputationResult` snapshot, parameters included, so a result can be
//! reloaded later for comparison without re-running the engine.

use std::fs::File;
use std::path::Path;

use crate::domain::TpaComputationResult;
use crate::error::TpaError;

pub fn write_result_json(path: &Path, result: &TpaComputationResult) -> Result<(), TpaError> {
    let file = File::create(path).map_err(|e| TpaError::Io {
        context: format!("failed to create result JSON '{}'", path.display()),
        source: e,
    })?;
    serde_json::to_writer_pretty(file, result).map_err(|e| TpaError::Json {
        context: format!("failed to write result JSON '{}'", path.display()),
        source: e,
    })?;
    Ok(())
}

pub fn read_result_json(path: &Path) -> Result<TpaComputationResult, TpaError> {
    let file = File::open(path).map_err(|e| TpaError::Io {
        context: format!("failed to open result JSON '{}'", path.display()),
        source: e,
    })?;
    let result: TpaComputationResult =
        serde_json::from_reader(file).map_err(|e| TpaError::Json {
            context: format!("invalid result JSON '{}'", path.display()),
            source: e,
        })?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SyntheticConfig, generate_dataset};
    use crate::domain::TpaComputationParams;
    use crate::engine::{CancelToken, compute};

    #[test]
    fn result_json_round_trips() {
        let dataset = generate_dataset(&SyntheticConfig {
            bins: 6,
            paths: 3,
            targets: 2,
            ..SyntheticConfig::default()
        })
        .unwrap();
        let result = compute(
            &dataset.frf,
            &dataset.operational,
            &TpaComputationParams::default(),
            &CancelToken::new(),
        )
        .unwrap();

        let dir = std::env::temp_dir().join("tpa-engine-io-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("result.json");

        write_result_json(&path, &result).unwrap();
        let back = read_result_json(&path).unwrap();
        assert_eq!(back, result);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_result_json(Path::new("/nonexistent/result.json")).unwrap_err();
        assert!(matches!(err, TpaError::Io { .. }));
    }
}
