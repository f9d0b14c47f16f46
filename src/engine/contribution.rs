//! Per-frequency contribution estimation.
//!
//! For every analyzed bin: restrict the FRF matrix to the requested target
//! rows, factorize, resolve the truncation rank, build the truncated
//! pseudo-inverse, and solve `contribution = A⁺_k · measured`.
//!
//! Bins are independent of each other, so the solve fans out over rayon;
//! collecting through an indexed parallel iterator restores deterministic
//! frequency order regardless of completion order. Compatibility between the
//! FRF and the operational measurement is validated up front so a mismatch
//! fails before any numerical work starts — no partial results.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::domain::{
    FrfMatrix, OperationalVector, SvdDiagnostics, TpaComputationParams,
};
use crate::engine::cancel::CancelToken;
use crate::error::TpaError;
use crate::math::{
    classify_quality, condition_number, effective_epsilon, factorize, resolve_rank,
    spectrum_condition_number, truncated_pseudo_inverse,
};

/// Which bins and target rows one request actually analyzes.
#[derive(Debug, Clone)]
pub struct AnalysisPlan {
    /// Grid indices inside the requested band, in frequency order.
    pub bins: Vec<usize>,
    /// Row index when a single target channel is requested.
    pub target_row: Option<usize>,
}

impl AnalysisPlan {
    pub fn resolve(
        frf: &FrfMatrix,
        operational: &OperationalVector,
        params: &TpaComputationParams,
    ) -> Result<Self, TpaError> {
        params.validate()?;
        validate_compatibility(frf, operational)?;

        let target_row = match &params.target {
            None => None,
            Some(name) => Some(frf.target_index(name).ok_or_else(|| {
                TpaError::Config(format!("unknown target channel '{name}'"))
            })?),
        };

        let bins = frf.grid().band_indices(params.frequency_band.as_ref());
        if bins.is_empty() {
            return Err(TpaError::Config(
                "frequency band filter selects no bins".to_string(),
            ));
        }

        Ok(Self { bins, target_row })
    }
}

fn validate_compatibility(
    frf: &FrfMatrix,
    operational: &OperationalVector,
) -> Result<(), TpaError> {
    if frf.grid().len() != operational.grid().len() {
        return Err(TpaError::DimensionMismatch {
            context: "frequency grid length".to_string(),
            expected: frf.grid().len().to_string(),
            actual: operational.grid().len().to_string(),
        });
    }
    for (i, (a, b)) in frf
        .grid()
        .values()
        .iter()
        .zip(operational.grid().values())
        .enumerate()
    {
        if a != b {
            return Err(TpaError::DimensionMismatch {
                context: format!("frequency grid value at bin {i}"),
                expected: format!("{a} Hz"),
                actual: format!("{b} Hz"),
            });
        }
    }
    if frf.targets().len() != operational.targets().len() {
        return Err(TpaError::DimensionMismatch {
            context: "target channel count".to_string(),
            expected: frf.targets().len().to_string(),
            actual: operational.targets().len().to_string(),
        });
    }
    for (i, (a, b)) in frf
        .targets()
        .iter()
        .zip(operational.targets())
        .enumerate()
    {
        if a != b {
            return Err(TpaError::DimensionMismatch {
                context: format!("target channel name at index {i}"),
                expected: a.clone(),
                actual: b.clone(),
            });
        }
    }
    Ok(())
}

/// Contribution solve for one bin.
#[derive(Debug, Clone)]
pub struct BinSolution {
    /// Index into the full frequency grid.
    pub bin: usize,
    pub frequency_hz: f64,
    /// One complex contribution per path.
    pub contribution: DVector<Complex64>,
    pub diagnostics: SvdDiagnostics,
}

/// Row-restrict a bin matrix when a single target channel is requested.
pub(crate) fn restrict_matrix(
    a: &DMatrix<Complex64>,
    target_row: Option<usize>,
) -> DMatrix<Complex64> {
    match target_row {
        None => a.clone(),
        Some(row) => DMatrix::from_fn(1, a.ncols(), |_, j| a[(row, j)]),
    }
}

pub(crate) fn restrict_vector(
    y: &DVector<Complex64>,
    target_row: Option<usize>,
) -> DVector<Complex64> {
    match target_row {
        None => y.clone(),
        Some(row) => DVector::from_element(1, y[row]),
    }
}

/// Solve every analyzed bin, in parallel, preserving frequency order.
pub fn estimate_contributions(
    frf: &FrfMatrix,
    operational: &OperationalVector,
    params: &TpaComputationParams,
    plan: &AnalysisPlan,
    cancel: &CancelToken,
) -> Result<Vec<BinSolution>, TpaError> {
    plan.bins
        .par_iter()
        .map(|&bin| {
            if cancel.is_cancelled() {
                return Err(TpaError::ComputationCancelled);
            }
            solve_bin(frf, operational, params, plan.target_row, bin)
        })
        .collect()
}

fn solve_bin(
    frf: &FrfMatrix,
    operational: &OperationalVector,
    params: &TpaComputationParams,
    target_row: Option<usize>,
    bin: usize,
) -> Result<BinSolution, TpaError> {
    let frequency_hz = frf.grid().values()[bin];
    let a = restrict_matrix(frf.bin(bin), target_row);
    let y = restrict_vector(operational.bin(bin), target_row);

    if y.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(TpaError::NonFiniteInput {
            context: format!("operational measurement at {frequency_hz} Hz"),
        });
    }

    let factors = factorize(&a, &format!("FRF matrix at {frequency_hz} Hz"))?;
    let singular_values = factors.singular_values();
    let sigma_max = singular_values.first().copied().unwrap_or(0.0);
    let tuning = &params.tuning;
    let epsilon = effective_epsilon(sigma_max, tuning.epsilon_abs, tuning.epsilon_rel);

    let decision = resolve_rank(params.truncation, singular_values, epsilon);
    let pinv = truncated_pseudo_inverse(&factors, decision.rank_used, epsilon);
    let contribution = &pinv * &y;

    let diagnostics = if decision.degenerate {
        SvdDiagnostics {
            frequency_hz,
            singular_values: singular_values.to_vec(),
            rank_used: decision.rank_used,
            condition_number: None,
            full_condition_number: None,
            quality: crate::domain::InversionQuality::Poor,
            degenerate: true,
        }
    } else {
        let full_condition = spectrum_condition_number(singular_values, epsilon);
        SvdDiagnostics {
            frequency_hz,
            singular_values: singular_values.to_vec(),
            rank_used: decision.rank_used,
            condition_number: Some(condition_number(
                singular_values,
                decision.rank_used,
                epsilon,
            )),
            full_condition_number: Some(full_condition),
            quality: classify_quality(full_condition, tuning.condition_threshold),
            degenerate: false,
        }
    };

    Ok(BinSolution {
        bin,
        frequency_hz,
        contribution,
        diagnostics,
    })
}
