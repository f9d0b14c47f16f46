//! Prediction and validation: reconstruct the response from the estimated
//! contributions and score it against the measurement.
//!
//! `predicted[bin] = A[bin] · contribution[bin]`, compared elementwise with
//! the measured operational vector. The per-bin relative error is
//! `‖predicted − measured‖ / ‖measured‖` in percent; bins whose measured
//! magnitude sits below the configured floor are flagged and kept in the
//! output but excluded from accuracy aggregation, so a near-silent bin never
//! turns into a divide-by-near-zero accuracy collapse.

use crate::domain::{
    AccuracyBand, BandAccuracy, BinError, FrfMatrix, OperationalVector,
    PredictionAccuracyReport, ResponseComparison, TpaComputationParams,
};
use crate::engine::contribution::{AnalysisPlan, BinSolution, restrict_matrix, restrict_vector};

/// Everything the aggregator needs from the validation pass.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub response: ResponseComparison,
    pub accuracy: PredictionAccuracyReport,
    /// `Σ_bins ‖predicted‖²` over the analyzed band.
    pub predicted_energy: f64,
    /// `Σ_targets |measured|²` per analyzed bin, for the dominant-frequency
    /// KPI.
    pub measured_bin_energy: Vec<f64>,
}

pub fn predict_and_score(
    frf: &FrfMatrix,
    operational: &OperationalVector,
    params: &TpaComputationParams,
    plan: &AnalysisPlan,
    solutions: &[BinSolution],
) -> PredictionOutcome {
    let n = solutions.len();
    let mut frequencies = Vec::with_capacity(n);
    let mut predicted = Vec::with_capacity(n);
    let mut measured = Vec::with_capacity(n);
    let mut errors = Vec::with_capacity(n);
    let mut measured_bin_energy = Vec::with_capacity(n);
    let mut predicted_energy = 0.0;

    for solution in solutions {
        let a = restrict_matrix(frf.bin(solution.bin), plan.target_row);
        let y = restrict_vector(operational.bin(solution.bin), plan.target_row);
        let reconstructed = &a * &solution.contribution;

        let predicted_norm = reconstructed.norm();
        let measured_norm = y.norm();

        frequencies.push(solution.frequency_hz);
        predicted.push(predicted_norm);
        measured.push(measured_norm);
        measured_bin_energy.push(measured_norm * measured_norm);
        predicted_energy += predicted_norm * predicted_norm;

        let excluded = measured_norm < params.tuning.measured_floor;
        let relative_error_pct = if excluded {
            0.0
        } else {
            (reconstructed - y).norm() / measured_norm * 100.0
        };
        errors.push(BinError {
            frequency_hz: solution.frequency_hz,
            relative_error_pct,
            excluded,
        });
    }

    let bands = score_bands(&params.tuning.accuracy_bands, &frequencies, &errors);
    let (overall_pct, _) = accuracy_over(errors.iter());

    PredictionOutcome {
        response: ResponseComparison {
            frequencies_hz: frequencies,
            predicted,
            measured,
        },
        accuracy: PredictionAccuracyReport {
            overall_pct,
            bands,
            errors,
        },
        predicted_energy,
        measured_bin_energy,
    }
}

/// Assign each bin to the first band containing it: `min <= f < max`, with
/// the last band also owning its upper edge. Contiguous non-overlapping
/// bands therefore partition a grid exactly.
pub fn band_bin_indices(bands: &[AccuracyBand], frequencies: &[f64]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new(); bands.len()];
    for (i, &f) in frequencies.iter().enumerate() {
        for (b, band) in bands.iter().enumerate() {
            let last = b == bands.len() - 1;
            if f >= band.min_hz && (f < band.max_hz || (last && f <= band.max_hz)) {
                out[b].push(i);
                break;
            }
        }
    }
    out
}

fn score_bands(
    bands: &[AccuracyBand],
    frequencies: &[f64],
    errors: &[BinError],
) -> Vec<BandAccuracy> {
    band_bin_indices(bands, frequencies)
        .into_iter()
        .zip(bands)
        .map(|(indices, band)| {
            let (accuracy_pct, bins) = accuracy_over(indices.iter().map(|&i| &errors[i]));
            BandAccuracy {
                name: band.name.clone(),
                min_hz: band.min_hz,
                max_hz: band.max_hz,
                accuracy_pct,
                bins,
            }
        })
        .collect()
}

/// `100 − mean(error%)` clamped to `[0, 100]` over non-excluded bins;
/// `None` when nothing is aggregatable.
fn accuracy_over<'a>(errors: impl Iterator<Item = &'a BinError>) -> (Option<f64>, usize) {
    let mut sum = 0.0;
    let mut count = 0usize;
    for error in errors {
        if !error.excluded {
            sum += error.relative_error_pct;
            count += 1;
        }
    }
    if count == 0 {
        (None, 0)
    } else {
        (Some((100.0 - sum / count as f64).clamp(0.0, 100.0)), count)
    }
}
