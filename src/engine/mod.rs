//! The TPA computation engine.
//!
//! One call to [`compute`] runs the whole pipeline for a single request:
//!
//! plan (validate + filter) -> per-bin SVD inversion + contribution solve
//! -> response reconstruction + accuracy scoring -> KPI aggregation
//!
//! The engine owns no long-lived state: inputs are borrowed read-only for
//! the duration of the call and the output is a fresh, independently owned
//! snapshot. Requests may therefore run concurrently without
//! synchronization. A failure in any sub-step aborts the whole computation —
//! a partially-inverted result is scientifically misleading, so there is no
//! best-effort partial output.

pub mod aggregate;
pub mod cancel;
pub mod contribution;
pub mod prediction;

pub use cancel::CancelToken;
pub use contribution::{AnalysisPlan, BinSolution};

use crate::domain::{FrfMatrix, OperationalVector, TpaComputationParams, TpaComputationResult};
use crate::error::TpaError;

/// Run one TPA computation.
///
/// Fails fast (before any numerical work) when the FRF and operational data
/// disagree on grid or target layout, and atomically discards all partial
/// per-bin work if `cancel` fires mid-flight.
pub fn compute(
    frf: &FrfMatrix,
    operational: &OperationalVector,
    params: &TpaComputationParams,
    cancel: &CancelToken,
) -> Result<TpaComputationResult, TpaError> {
    let plan = AnalysisPlan::resolve(frf, operational, params)?;
    log::debug!(
        "analysis plan: {} of {} bins, target filter {:?}",
        plan.bins.len(),
        frf.grid().len(),
        params.target
    );

    let solutions = contribution::estimate_contributions(frf, operational, params, &plan, cancel)?;
    let outcome = prediction::predict_and_score(frf, operational, params, &plan, &solutions);

    let targets = match plan.target_row {
        Some(row) => vec![frf.targets()[row].clone()],
        None => frf.targets().to_vec(),
    };

    Ok(aggregate::assemble(
        params.clone(),
        frf.paths(),
        targets,
        aggregate::transfer_table(frf, &plan),
        &solutions,
        &outcome,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BandFilter, EngineTuning, FrequencyGrid, InversionQuality, TruncationSpec,
    };
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};
    use num_complex::Complex64;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn frf_from_rows(
        frequencies: &[f64],
        targets: &[&str],
        paths: &[&str],
        bins: Vec<DMatrix<Complex64>>,
    ) -> FrfMatrix {
        FrfMatrix::new(
            FrequencyGrid::new(frequencies.to_vec()).unwrap(),
            targets.iter().map(|s| s.to_string()).collect(),
            paths.iter().map(|s| s.to_string()).collect(),
            bins,
        )
        .unwrap()
    }

    fn operational(
        frequencies: &[f64],
        targets: &[&str],
        bins: Vec<DVector<Complex64>>,
    ) -> OperationalVector {
        OperationalVector::new(
            FrequencyGrid::new(frequencies.to_vec()).unwrap(),
            targets.iter().map(|s| s.to_string()).collect(),
            bins,
        )
        .unwrap()
    }

    fn params_pct(pct: f64) -> TpaComputationParams {
        TpaComputationParams {
            frequency_band: None,
            target: None,
            truncation: TruncationSpec::Percentage(pct),
            tuning: EngineTuning::default(),
        }
    }

    #[test]
    fn row_vector_scenario_recovers_exact_contribution() {
        // 3 paths x 1 target at 100 Hz: A = [[1, 0, 0]], measured = [2].
        let frf = frf_from_rows(
            &[100.0],
            &["T1"],
            &["P1", "P2", "P3"],
            vec![DMatrix::from_row_slice(1, 3, &[c(1.0), c(0.0), c(0.0)])],
        );
        let op = operational(&[100.0], &["T1"], vec![DVector::from_element(1, c(2.0))]);

        let result = compute(&frf, &op, &params_pct(100.0), &CancelToken::new()).unwrap();

        let diag = &result.svd[0];
        assert_eq!(diag.singular_values.len(), 1);
        assert_relative_eq!(diag.singular_values[0], 1.0, max_relative = 1e-12);
        assert_eq!(diag.rank_used, 1);
        assert_relative_eq!(diag.condition_number.unwrap(), 1.0);
        assert_eq!(diag.quality, InversionQuality::Good);

        let mags: Vec<f64> = result
            .contributions
            .paths
            .iter()
            .map(|p| p.magnitudes[0])
            .collect();
        assert_relative_eq!(mags[0], 2.0, max_relative = 1e-9);
        assert_relative_eq!(mags[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(mags[2], 0.0, epsilon = 1e-9);

        assert_relative_eq!(result.response.predicted[0], 2.0, max_relative = 1e-9);
        assert_relative_eq!(result.accuracy.overall_pct.unwrap(), 100.0, epsilon = 1e-6);
    }

    #[test]
    fn ill_conditioned_bin_reports_poor_quality() {
        // A = [[1, 0], [0, 1e-6]], truncation 50% -> rank 1 of 2. The
        // inversion performed is stable (condition 1) but the underlying
        // spectrum condition is 1e6, far past the default threshold of 15.
        let frf = frf_from_rows(
            &[100.0],
            &["T1", "T2"],
            &["P1", "P2"],
            vec![DMatrix::from_row_slice(
                2,
                2,
                &[c(1.0), c(0.0), c(0.0), c(1e-6)],
            )],
        );
        let op = operational(
            &[100.0],
            &["T1", "T2"],
            vec![DVector::from_row_slice(&[c(1.0), c(1.0)])],
        );

        let result = compute(&frf, &op, &params_pct(50.0), &CancelToken::new()).unwrap();

        let diag = &result.svd[0];
        assert_eq!(diag.rank_used, 1);
        assert_relative_eq!(diag.condition_number.unwrap(), 1.0);
        assert_relative_eq!(
            diag.full_condition_number.unwrap(),
            1e6,
            max_relative = 1e-6
        );
        assert_eq!(diag.quality, InversionQuality::Poor);
    }

    #[test]
    fn full_rank_round_trip_reproduces_measured_response() {
        // Non-degenerate square FRF with everything retained: the
        // pseudo-inverse is a true inverse, so predicted == measured to
        // numerical tolerance.
        let frequencies = [100.0, 200.0, 400.0];
        let bins: Vec<DMatrix<Complex64>> = (0..3)
            .map(|i| {
                let s = 1.0 + i as f64;
                DMatrix::from_row_slice(
                    2,
                    2,
                    &[
                        Complex64::new(1.5 * s, 0.4),
                        Complex64::new(0.3, -0.2),
                        Complex64::new(-0.1, 0.6),
                        Complex64::new(2.0, 0.1 * s),
                    ],
                )
            })
            .collect();
        let frf = frf_from_rows(&frequencies, &["T1", "T2"], &["P1", "P2"], bins);
        let op = operational(
            &frequencies,
            &["T1", "T2"],
            (0..3)
                .map(|i| {
                    DVector::from_row_slice(&[
                        Complex64::new(1.0 + i as f64, 0.5),
                        Complex64::new(-0.7, 0.3 * i as f64),
                    ])
                })
                .collect(),
        );

        let result = compute(&frf, &op, &params_pct(100.0), &CancelToken::new()).unwrap();

        for error in &result.accuracy.errors {
            assert!(!error.excluded);
            assert!(
                error.relative_error_pct <= 1e-7,
                "relative error {} too large",
                error.relative_error_pct
            );
        }
        assert!(result.accuracy.overall_pct.unwrap() > 99.999);
    }

    #[test]
    fn reconstruction_error_never_increases_with_rank() {
        // Fixed 3x3 matrix; sweep the retained rank via the percentage spec
        // and check the mean reconstruction error is non-increasing in k.
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[
                c(4.0),
                c(1.0),
                c(0.5),
                c(1.0),
                c(3.0),
                c(0.2),
                c(0.5),
                c(0.2),
                c(2.0),
            ],
        );
        let frf = frf_from_rows(&[100.0], &["T1", "T2", "T3"], &["P1", "P2", "P3"], vec![a]);
        let op = operational(
            &[100.0],
            &["T1", "T2", "T3"],
            vec![DVector::from_row_slice(&[c(1.0), c(2.0), c(3.0)])],
        );

        // 33% -> rank 1, 50% -> rank 2, 100% -> rank 3.
        let mut previous = f64::INFINITY;
        for pct in [33.0, 50.0, 100.0] {
            let result = compute(&frf, &op, &params_pct(pct), &CancelToken::new()).unwrap();
            let error = result.accuracy.errors[0].relative_error_pct;
            assert!(
                error <= previous + 1e-9,
                "error increased from {previous} to {error} at pct {pct}"
            );
            previous = error;
        }
    }

    #[test]
    fn grid_length_mismatch_is_rejected_before_computation() {
        let frf_freqs: Vec<f64> = (1..=10).map(|i| 100.0 * i as f64).collect();
        let op_freqs: Vec<f64> = (1..=8).map(|i| 100.0 * i as f64).collect();
        let frf = frf_from_rows(
            &frf_freqs,
            &["T1"],
            &["P1"],
            (0..10).map(|_| DMatrix::from_element(1, 1, c(1.0))).collect(),
        );
        let op = operational(
            &op_freqs,
            &["T1"],
            (0..8).map(|_| DVector::from_element(1, c(1.0))).collect(),
        );

        let err = compute(&frf, &op, &params_pct(100.0), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, TpaError::DimensionMismatch { .. }));
    }

    #[test]
    fn band_filter_omits_out_of_band_bins() {
        let frequencies = [50.0, 150.0, 450.0, 900.0];
        let frf = frf_from_rows(
            &frequencies,
            &["T1"],
            &["P1"],
            (0..4).map(|_| DMatrix::from_element(1, 1, c(1.0))).collect(),
        );
        let op = operational(
            &frequencies,
            &["T1"],
            (0..4).map(|i| DVector::from_element(1, c(i as f64 + 1.0))).collect(),
        );

        let mut params = params_pct(100.0);
        params.frequency_band = Some(BandFilter {
            min_hz: 100.0,
            max_hz: 500.0,
        });
        let result = compute(&frf, &op, &params, &CancelToken::new()).unwrap();

        assert_eq!(result.contributions.frequencies_hz, vec![150.0, 450.0]);
        assert_eq!(result.svd.len(), 2);
        assert_eq!(result.response.measured.len(), 2);
        assert_eq!(result.transfer_functions.frequencies_hz, vec![150.0, 450.0]);
        assert_relative_eq!(
            result.transfer_functions.paths[0].magnitudes[0],
            1.0,
            max_relative = 1e-12
        );
        // Aggregate levels must reflect only the filtered view.
        let path = &result.contributions.paths[0];
        let expected_energy = 2.0_f64.powi(2) + 3.0_f64.powi(2);
        assert_relative_eq!(
            path.level_db,
            10.0 * expected_energy.log10(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn target_filter_restricts_rows_before_inversion() {
        let frf = frf_from_rows(
            &[100.0],
            &["T1", "T2"],
            &["P1", "P2"],
            vec![DMatrix::from_row_slice(
                2,
                2,
                &[c(1.0), c(0.0), c(0.0), c(1.0)],
            )],
        );
        let op = operational(
            &[100.0],
            &["T1", "T2"],
            vec![DVector::from_row_slice(&[c(5.0), c(7.0)])],
        );

        let mut params = params_pct(100.0);
        params.target = Some("T2".to_string());
        let result = compute(&frf, &op, &params, &CancelToken::new()).unwrap();

        // Row restriction: a 1x2 system has exactly one singular value.
        assert_eq!(result.svd[0].singular_values.len(), 1);
        assert_eq!(result.targets, vec!["T2".to_string()]);
        assert_relative_eq!(result.response.measured[0], 7.0, max_relative = 1e-12);
    }

    #[test]
    fn unknown_target_is_a_config_error() {
        let frf = frf_from_rows(
            &[100.0],
            &["T1"],
            &["P1"],
            vec![DMatrix::from_element(1, 1, c(1.0))],
        );
        let op = operational(&[100.0], &["T1"], vec![DVector::from_element(1, c(1.0))]);

        let mut params = params_pct(100.0);
        params.target = Some("nope".to_string());
        let err = compute(&frf, &op, &params, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, TpaError::Config(_)));
    }

    #[test]
    fn cancellation_discards_the_whole_computation() {
        let frequencies: Vec<f64> = (1..=32).map(|i| 50.0 * i as f64).collect();
        let frf = frf_from_rows(
            &frequencies,
            &["T1"],
            &["P1"],
            (0..32).map(|_| DMatrix::from_element(1, 1, c(1.0))).collect(),
        );
        let op = operational(
            &frequencies,
            &["T1"],
            (0..32).map(|_| DVector::from_element(1, c(1.0))).collect(),
        );

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = compute(&frf, &op, &params_pct(100.0), &cancel).unwrap_err();
        assert!(matches!(err, TpaError::ComputationCancelled));
    }

    #[test]
    fn degenerate_bin_degrades_gracefully() {
        // One healthy bin, one all-zero bin. The zero bin must not fail the
        // request: it reports rank 1, Poor quality, zero contributions.
        let frf = frf_from_rows(
            &[100.0, 200.0],
            &["T1"],
            &["P1", "P2"],
            vec![
                DMatrix::from_row_slice(1, 2, &[c(1.0), c(0.5)]),
                DMatrix::from_row_slice(1, 2, &[c(0.0), c(0.0)]),
            ],
        );
        let op = operational(
            &[100.0, 200.0],
            &["T1"],
            vec![
                DVector::from_element(1, c(1.0)),
                DVector::from_element(1, c(1.0)),
            ],
        );

        let result = compute(&frf, &op, &params_pct(100.0), &CancelToken::new()).unwrap();
        let degenerate = &result.svd[1];
        assert!(degenerate.degenerate);
        assert_eq!(degenerate.rank_used, 1);
        assert_eq!(degenerate.quality, InversionQuality::Poor);
        assert_eq!(degenerate.condition_number, None);
        for path in &result.contributions.paths {
            assert_relative_eq!(path.magnitudes[1], 0.0, epsilon = 1e-12);
        }
    }
}
