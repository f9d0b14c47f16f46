//! Matrix algebra kernel: SVD factorization and truncated pseudo-inversion.
//!
//! For one frequency bin the FRF sub-matrix `A` (targets × paths) is
//! factorized as `A = U·Σ·Vᴴ` with singular values sorted descending, and
//! inverted as `A⁺_k = V_k·Σ_k⁻¹·U_kᴴ` for a retained rank `k`.
//!
//! Numerical policy: singular values below an absolute/relative epsilon are
//! treated as zero and excluded from the inversion even when `k` would
//! otherwise include them, so a near-null direction never turns into a
//! division blow-up. The condition number of the inversion performed uses
//! the smallest *retained* singular value, not the true smallest.

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::error::TpaError;

/// SVD factors of one bin matrix, singular values descending.
#[derive(Debug, Clone)]
pub struct SvdFactors {
    u: DMatrix<Complex64>,
    v_t: DMatrix<Complex64>,
    singular_values: Vec<f64>,
}

impl SvdFactors {
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    /// Number of singular values available, `min(rows, cols)`.
    pub fn rank_available(&self) -> usize {
        self.singular_values.len()
    }
}

/// Factorize a bin matrix. Pure function of its input.
///
/// Fails with `InvalidDimension` when either dimension is zero and with
/// `NonFiniteInput` when any entry is NaN or infinite.
pub fn factorize(a: &DMatrix<Complex64>, context: &str) -> Result<SvdFactors, TpaError> {
    if a.nrows() == 0 || a.ncols() == 0 {
        return Err(TpaError::InvalidDimension {
            context: context.to_string(),
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    if a.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(TpaError::NonFiniteInput {
            context: context.to_string(),
        });
    }

    let svd = a.clone().svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(TpaError::NonFiniteInput {
                context: format!("{context}: SVD produced no factors"),
            });
        }
    };
    let singular_values: Vec<f64> = svd.singular_values.iter().copied().collect();

    Ok(SvdFactors {
        u,
        v_t,
        singular_values,
    })
}

/// Epsilon below which a singular value counts as zero, combining the
/// absolute floor with a floor relative to the largest singular value.
pub fn effective_epsilon(sigma_max: f64, epsilon_abs: f64, epsilon_rel: f64) -> f64 {
    epsilon_abs.max(epsilon_rel * sigma_max)
}

/// Truncated pseudo-inverse `A⁺_k = V_k·Σ_k⁻¹·U_kᴴ` (paths × targets).
///
/// Singular values below `epsilon` are excluded even inside the first `k`;
/// when everything is excluded the result is the zero map and the
/// contribution solved through it is zero.
pub fn truncated_pseudo_inverse(
    factors: &SvdFactors,
    rank: usize,
    epsilon: f64,
) -> DMatrix<Complex64> {
    let targets = factors.u.nrows();
    let paths = factors.v_t.ncols();
    let mut pinv = DMatrix::<Complex64>::zeros(paths, targets);

    let k = rank.min(factors.singular_values.len());
    for i in 0..k {
        let sigma = factors.singular_values[i];
        // Descending order: everything past the first excluded value is
        // excluded too.
        if sigma < epsilon || sigma <= 0.0 {
            break;
        }
        let v_i = factors.v_t.row(i).adjoint();
        let u_i = factors.u.column(i);
        pinv.gerc(
            Complex64::new(1.0 / sigma, 0.0),
            &v_i,
            &u_i,
            Complex64::new(1.0, 0.0),
        );
    }

    pinv
}

/// Condition number of the inversion actually performed: `σ₁ / σ_k` over the
/// retained (first `rank`, above-epsilon) singular values. `+∞` when nothing
/// is retained.
pub fn condition_number(singular_values: &[f64], rank: usize, epsilon: f64) -> f64 {
    let k = rank.min(singular_values.len());
    let used = &singular_values[..k];
    let smallest_retained = used.iter().rev().find(|&&s| s >= epsilon && s > 0.0);
    match (singular_values.first(), smallest_retained) {
        (Some(&s1), Some(&sk)) => s1 / sk,
        _ => f64::INFINITY,
    }
}

/// Condition number of the epsilon-retained full spectrum, `σ₁ / σ_min≥ε`.
/// This is the number that drives the inversion-quality flag: it reflects
/// how ill-conditioned the bin matrix itself is, independent of how hard the
/// truncation cut.
pub fn spectrum_condition_number(singular_values: &[f64], epsilon: f64) -> f64 {
    condition_number(singular_values, singular_values.len(), epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn real_matrix(rows: usize, cols: usize, data: &[f64]) -> DMatrix<Complex64> {
        DMatrix::from_row_slice(
            rows,
            cols,
            &data
                .iter()
                .map(|&x| Complex64::new(x, 0.0))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn factorize_rejects_empty_and_non_finite() {
        let empty = DMatrix::<Complex64>::zeros(0, 3);
        assert!(matches!(
            factorize(&empty, "test").unwrap_err(),
            TpaError::InvalidDimension { .. }
        ));

        let mut bad = real_matrix(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        bad[(0, 1)] = Complex64::new(f64::NAN, 0.0);
        assert!(matches!(
            factorize(&bad, "test").unwrap_err(),
            TpaError::NonFiniteInput { .. }
        ));
    }

    #[test]
    fn singular_values_are_descending() {
        let a = real_matrix(2, 2, &[1.0, 0.0, 0.0, 3.0]);
        let f = factorize(&a, "test").unwrap();
        assert_eq!(f.rank_available(), 2);
        assert_relative_eq!(f.singular_values()[0], 3.0, max_relative = 1e-12);
        assert_relative_eq!(f.singular_values()[1], 1.0, max_relative = 1e-12);
    }

    #[test]
    fn full_rank_pseudo_inverse_is_true_inverse() {
        let a = DMatrix::from_row_slice(
            2,
            2,
            &[
                Complex64::new(0.0, 1.0),
                Complex64::new(0.0, 0.0),
                Complex64::new(0.0, 0.0),
                Complex64::new(2.0, 0.0),
            ],
        );
        let f = factorize(&a, "test").unwrap();
        let pinv = truncated_pseudo_inverse(&f, 2, 1e-12);
        let product = &pinv * &a;
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product[(i, j)].re, expected, epsilon = 1e-12);
                assert_relative_eq!(product[(i, j)].im, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn truncation_zeroes_discarded_directions() {
        let a = real_matrix(2, 2, &[1.0, 0.0, 0.0, 1e-6]);
        let f = factorize(&a, "test").unwrap();
        let pinv = truncated_pseudo_inverse(&f, 1, 1e-12);
        assert_relative_eq!(pinv[(0, 0)].re, 1.0, max_relative = 1e-9);
        assert_relative_eq!(pinv[(1, 1)].re, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn epsilon_excludes_tiny_values_despite_requested_rank() {
        let a = real_matrix(2, 2, &[1.0, 0.0, 0.0, 1e-15]);
        let f = factorize(&a, "test").unwrap();
        let pinv = truncated_pseudo_inverse(&f, 2, 1e-12);
        // The 1e-15 direction would contribute 1e15 to the inverse; it must
        // be excluded instead.
        assert!(pinv[(1, 1)].norm() < 1.0);
    }

    #[test]
    fn condition_number_uses_retained_values_only() {
        let sv = [1.0, 1e-6];
        assert_relative_eq!(condition_number(&sv, 1, 1e-12), 1.0);
        assert_relative_eq!(condition_number(&sv, 2, 1e-12), 1e6, max_relative = 1e-9);
        assert_relative_eq!(
            spectrum_condition_number(&sv, 1e-12),
            1e6,
            max_relative = 1e-9
        );
        // Epsilon exclusion shrinks the retained set.
        assert_relative_eq!(condition_number(&sv, 2, 1e-3), 1.0);
        assert_eq!(condition_number(&[0.0, 0.0], 2, 1e-12), f64::INFINITY);
    }
}
