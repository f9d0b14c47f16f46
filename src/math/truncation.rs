//! Truncation policy: map a `TruncationSpec` plus a singular-value sequence
//! to the integer rank actually inverted, and classify inversion quality.
//!
//! Ill-conditioned FRF data is common in practice, so a degenerate bin (all
//! singular values below epsilon) does not fail the request: the rank is
//! forced to 1, the inversion degrades to a zero map, and the bin is flagged
//! `Poor` so downstream consumers can see exactly what happened.

use crate::domain::{InversionQuality, TruncationSpec};

/// Resolved rank for one bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankDecision {
    /// Rank the spec asked for, before epsilon exclusion.
    pub rank_requested: usize,
    /// Rank actually inverted (capped by the above-epsilon count).
    pub rank_used: usize,
    /// Every singular value fell below epsilon.
    pub degenerate: bool,
}

/// Resolve a truncation spec against the singular values of one bin.
///
/// `singular_values` must be sorted descending (as the kernel produces them);
/// `epsilon` is the effective zero floor for this bin.
pub fn resolve_rank(spec: TruncationSpec, singular_values: &[f64], epsilon: f64) -> RankDecision {
    let count = singular_values.len();
    let usable = singular_values
        .iter()
        .take_while(|&&s| s >= epsilon && s > 0.0)
        .count();

    if count == 0 || usable == 0 {
        return RankDecision {
            rank_requested: 1,
            rank_used: 1,
            degenerate: true,
        };
    }

    let rank_requested = match spec {
        TruncationSpec::Percentage(pct) => {
            let k = ((count as f64) * (pct / 100.0)).ceil() as usize;
            k.clamp(1, count)
        }
        TruncationSpec::Energy(threshold) => {
            let total: f64 = singular_values.iter().map(|s| s * s).sum();
            let mut cumulative = 0.0;
            let mut k = count;
            for (i, s) in singular_values.iter().enumerate() {
                cumulative += s * s;
                if cumulative >= threshold * total {
                    k = i + 1;
                    break;
                }
            }
            k
        }
    };

    RankDecision {
        rank_requested,
        rank_used: rank_requested.min(usable),
        degenerate: false,
    }
}

/// Classify inversion quality against the configurable condition threshold.
///
/// The classification uses the full-spectrum condition number (see
/// `math::svd::spectrum_condition_number`), so a bin whose matrix is
/// ill-conditioned reports `Poor` even when a hard truncation made the
/// performed inversion itself stable.
pub fn classify_quality(full_condition_number: f64, threshold: f64) -> InversionQuality {
    if full_condition_number < threshold {
        InversionQuality::Good
    } else {
        InversionQuality::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn percentage_maps_to_ceil_and_clamps() {
        let sv = [4.0, 3.0, 2.0, 1.0];
        assert_eq!(resolve_rank(TruncationSpec::Percentage(100.0), &sv, EPS).rank_used, 4);
        assert_eq!(resolve_rank(TruncationSpec::Percentage(50.0), &sv, EPS).rank_used, 2);
        // 25% of 4 = 1; 10% of 4 = 0.4 -> ceil -> 1.
        assert_eq!(resolve_rank(TruncationSpec::Percentage(25.0), &sv, EPS).rank_used, 1);
        assert_eq!(resolve_rank(TruncationSpec::Percentage(10.0), &sv, EPS).rank_used, 1);
        // 60% of 4 = 2.4 -> ceil -> 3.
        assert_eq!(resolve_rank(TruncationSpec::Percentage(60.0), &sv, EPS).rank_used, 3);
    }

    #[test]
    fn energy_takes_smallest_rank_reaching_threshold() {
        // Energies: 100, 1, 1 -> total 102.
        let sv = [10.0, 1.0, 1.0];
        assert_eq!(resolve_rank(TruncationSpec::Energy(0.9), &sv, EPS).rank_used, 1);
        assert_eq!(resolve_rank(TruncationSpec::Energy(0.99), &sv, EPS).rank_used, 2);
        assert_eq!(resolve_rank(TruncationSpec::Energy(1.0), &sv, EPS).rank_used, 3);
    }

    #[test]
    fn epsilon_caps_the_used_rank() {
        let sv = [1.0, 1e-15];
        let decision = resolve_rank(TruncationSpec::Percentage(100.0), &sv, EPS);
        assert_eq!(decision.rank_requested, 2);
        assert_eq!(decision.rank_used, 1);
        assert!(!decision.degenerate);
    }

    #[test]
    fn degenerate_spectrum_forces_rank_one() {
        let sv = [1e-15, 1e-16];
        let decision = resolve_rank(TruncationSpec::Percentage(100.0), &sv, EPS);
        assert!(decision.degenerate);
        assert_eq!(decision.rank_used, 1);
    }

    #[test]
    fn quality_threshold_splits_good_and_poor() {
        assert_eq!(classify_quality(1.0, 15.0), InversionQuality::Good);
        assert_eq!(classify_quality(14.9, 15.0), InversionQuality::Good);
        assert_eq!(classify_quality(15.0, 15.0), InversionQuality::Poor);
        assert_eq!(classify_quality(1e6, 15.0), InversionQuality::Poor);
        assert_eq!(classify_quality(f64::INFINITY, 15.0), InversionQuality::Poor);
    }
}
