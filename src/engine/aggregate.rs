//! Result aggregation: KPI scalars and assembly of the immutable snapshot.

use chrono::Utc;

use crate::domain::{
    ContributionSpectrum, FrfMatrix, Kpis, PathContribution, PathTransfer,
    TpaComputationParams, TpaComputationResult, TransferFunctionTable,
};
use crate::engine::contribution::{AnalysisPlan, BinSolution, restrict_matrix};
use crate::engine::prediction::PredictionOutcome;

/// Floor applied before `log10` so silent paths report a very low level
/// instead of negative infinity (which plain JSON cannot carry).
const LEVEL_FLOOR: f64 = 1e-30;

/// Energy-to-level conversion, dB re 1.0.
fn level_db(energy: f64) -> f64 {
    10.0 * energy.max(LEVEL_FLOOR).log10()
}

/// Transfer-function magnitude table over the analyzed bins: per path per
/// bin, the 2-norm of the (target-restricted) FRF column.
pub fn transfer_table(frf: &FrfMatrix, plan: &AnalysisPlan) -> TransferFunctionTable {
    let frequencies_hz: Vec<f64> = plan
        .bins
        .iter()
        .map(|&bin| frf.grid().values()[bin])
        .collect();

    let mut magnitudes: Vec<Vec<f64>> = vec![Vec::with_capacity(plan.bins.len()); frf.paths().len()];
    for &bin in &plan.bins {
        let a = restrict_matrix(frf.bin(bin), plan.target_row);
        for (p, column) in magnitudes.iter_mut().enumerate() {
            column.push(a.column(p).norm());
        }
    }

    TransferFunctionTable {
        frequencies_hz,
        paths: frf
            .paths()
            .iter()
            .zip(magnitudes)
            .map(|(path, magnitudes)| PathTransfer {
                path: path.clone(),
                magnitudes,
            })
            .collect(),
    }
}

pub fn assemble(
    params: TpaComputationParams,
    paths: &[String],
    targets: Vec<String>,
    transfer_functions: TransferFunctionTable,
    solutions: &[BinSolution],
    outcome: &PredictionOutcome,
) -> TpaComputationResult {
    let frequencies_hz: Vec<f64> = solutions.iter().map(|s| s.frequency_hz).collect();

    // Transpose the per-bin contribution vectors into per-path spectra.
    let mut magnitudes: Vec<Vec<f64>> = vec![Vec::with_capacity(solutions.len()); paths.len()];
    let mut path_energy = vec![0.0_f64; paths.len()];
    for solution in solutions {
        for (p, energy) in path_energy.iter_mut().enumerate() {
            let magnitude = solution.contribution[p].norm();
            magnitudes[p].push(magnitude);
            *energy += magnitude * magnitude;
        }
    }

    let contributions = ContributionSpectrum {
        frequencies_hz,
        paths: paths
            .iter()
            .zip(magnitudes)
            .zip(&path_energy)
            .map(|((path, magnitudes), &energy)| PathContribution {
                path: path.clone(),
                magnitudes,
                level_db: level_db(energy),
            })
            .collect(),
    };

    let total_energy: f64 = path_energy.iter().sum();

    // Peak path: highest aggregate energy, ties broken by path order.
    let peak_path = path_energy
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| paths[i].clone())
        .unwrap_or_default();

    // Dominant frequency: argmax of the measured spectrum over the analyzed
    // band, ties broken by the lower bin.
    let dominant_frequency_hz = outcome
        .measured_bin_energy
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| solutions[i].frequency_hz)
        .unwrap_or(0.0);

    let transfer_efficiency_pct = if total_energy > 0.0 {
        (100.0 * outcome.predicted_energy / total_energy).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let poor_bins = solutions
        .iter()
        .filter(|s| s.diagnostics.quality == crate::domain::InversionQuality::Poor)
        .count();
    if poor_bins > 0 {
        log::warn!(
            "{poor_bins} of {} bins inverted with Poor quality",
            solutions.len()
        );
    }

    TpaComputationResult {
        params,
        targets,
        kpis: Kpis {
            overall_level_db: level_db(total_energy),
            peak_path,
            dominant_frequency_hz,
            transfer_efficiency_pct,
        },
        contributions,
        svd: solutions.iter().map(|s| s.diagnostics.clone()).collect(),
        transfer_functions,
        response: outcome.response.clone(),
        accuracy: outcome.accuracy.clone(),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn level_conversion_is_energy_based() {
        // 10·log10(100) = 20 dB.
        assert_relative_eq!(level_db(100.0), 20.0);
        // The floor keeps silent paths finite.
        assert_relative_eq!(level_db(0.0), -300.0);
    }
}
