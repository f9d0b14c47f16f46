//! Export per-path contributions to CSV.
//!
//! Long format (one row per path per analyzed bin) so the file drops
//! straight into spreadsheets and downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::TpaComputationResult;
use crate::error::TpaError;

pub fn write_contributions_csv(
    path: &Path,
    result: &TpaComputationResult,
) -> Result<(), TpaError> {
    let mut file = File::create(path).map_err(|e| TpaError::Io {
        context: format!("failed to create export CSV '{}'", path.display()),
        source: e,
    })?;

    let write_err = |e: std::io::Error| TpaError::Io {
        context: format!("failed to write export CSV '{}'", path.display()),
        source: e,
    };

    writeln!(file, "path,frequency_hz,contribution_magnitude,path_level_db")
        .map_err(write_err)?;

    for path_contribution in &result.contributions.paths {
        for (freq, magnitude) in result
            .contributions
            .frequencies_hz
            .iter()
            .zip(&path_contribution.magnitudes)
        {
            writeln!(
                file,
                "{},{:.6},{:.10e},{:.4}",
                path_contribution.path, freq, magnitude, path_contribution.level_db,
            )
            .map_err(write_err)?;
        }
    }

    Ok(())
}
