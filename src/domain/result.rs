//! Output-side domain types: the immutable computation snapshot.
//!
//! Everything here is a plain serializable structure: raw numbers, no
//! pre-rounded strings, no colors. Display formatting (units, rounding,
//! thresholds-to-colors) belongs to presentation layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::TpaComputationParams;

/// Classification of how trustworthy a bin inversion is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InversionQuality {
    Good,
    Poor,
}

/// Per-bin SVD diagnostics.
///
/// Two condition numbers are reported because they answer different
/// questions:
///
/// - `condition_number` = `σ₁/σ_k` over the singular values actually used,
///   so it reflects the inversion performed (a rank-1 truncation of an
///   ill-conditioned matrix is itself well-conditioned);
/// - `full_condition_number` = `σ₁/σ_min` over the epsilon-retained
///   spectrum, so it reflects how ill-conditioned the underlying bin matrix
///   is. The quality flag classifies on this one, against the configurable
///   threshold echoed in the result parameters.
///
/// Both are `None` for a degenerate bin, where no singular value survived
/// the epsilon floor and no inversion took place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvdDiagnostics {
    pub frequency_hz: f64,
    /// Singular values, descending, non-negative.
    pub singular_values: Vec<f64>,
    pub rank_used: usize,
    pub condition_number: Option<f64>,
    pub full_condition_number: Option<f64>,
    pub quality: InversionQuality,
    /// All singular values fell below epsilon; the inversion degraded to a
    /// zero map and the contribution at this bin is zero.
    pub degenerate: bool,
}

/// Per-path contribution over the analyzed band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathContribution {
    pub path: String,
    /// Contribution magnitude per analyzed bin, in frequency order.
    pub magnitudes: Vec<f64>,
    /// Energy-summed aggregate level: `10·log10(Σ|c|²)` dB re 1.0.
    /// Contributions combine as energies, not as linear levels, so this is
    /// not an arithmetic mean of the magnitudes.
    pub level_db: f64,
}

/// Mapping from path name to per-frequency contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionSpectrum {
    /// Analyzed frequencies (post band filter), in order.
    pub frequencies_hz: Vec<f64>,
    pub paths: Vec<PathContribution>,
}

/// Relative reconstruction error at one analyzed bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinError {
    pub frequency_hz: f64,
    /// `‖predicted − measured‖ / ‖measured‖ · 100` over the analyzed target
    /// channels. Meaningless when `excluded` is set.
    pub relative_error_pct: f64,
    /// The measured magnitude fell below the configured floor; the bin is
    /// flagged here instead of silently dropped, but does not enter accuracy
    /// aggregation.
    pub excluded: bool,
}

/// Accuracy over one named sub-band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandAccuracy {
    pub name: String,
    pub min_hz: f64,
    pub max_hz: f64,
    /// `100 − mean(error%)`, clamped to `[0, 100]`. `None` when the band
    /// holds no aggregatable bin (empty or all excluded).
    pub accuracy_pct: Option<f64>,
    /// Number of bins aggregated (excluded bins not counted).
    pub bins: usize,
}

/// Prediction-accuracy report for one computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionAccuracyReport {
    /// Accuracy over the full analysis band (post frequency filter).
    pub overall_pct: Option<f64>,
    pub bands: Vec<BandAccuracy>,
    /// Raw per-frequency error sequence for charting by external UIs.
    pub errors: Vec<BinError>,
}

/// Transfer-function magnitude per path per analyzed bin, for heatmap-style
/// views. Multi-target requests report the 2-norm over the analyzed target
/// channels, so the table has one scalar per (path, bin) regardless of the
/// target filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTransfer {
    pub path: String,
    pub magnitudes: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFunctionTable {
    pub frequencies_hz: Vec<f64>,
    pub paths: Vec<PathTransfer>,
}

/// Predicted vs. measured response magnitudes over the analyzed band.
///
/// Magnitudes are the stacked-target vector norms per bin, so single- and
/// multi-target requests serialize the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseComparison {
    pub frequencies_hz: Vec<f64>,
    pub predicted: Vec<f64>,
    pub measured: Vec<f64>,
}

/// KPI scalars for dashboard headline cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// `10·log10(Σ_paths Σ_bins |c|²)` dB re 1.0 over the analyzed band.
    pub overall_level_db: f64,
    /// Path with the highest aggregate contribution level.
    pub peak_path: String,
    /// Frequency of the bin with the largest measured-response energy.
    pub dominant_frequency_hz: f64,
    /// `100 · Σ‖predicted‖² / Σ‖contribution‖²`, clamped to `[0, 100]`:
    /// reconstructed response energy relative to total estimated source
    /// energy over the analyzed band.
    pub transfer_efficiency_pct: f64,
}

/// Immutable snapshot of one TPA computation.
///
/// Created once per request and never mutated; downstream persistence treats
/// it as an opaque artifact keyed by the request parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpaComputationResult {
    /// Request echo, including every tuning threshold that shaped the
    /// numbers below.
    pub params: TpaComputationParams,
    /// Target channels analyzed (after the optional target filter).
    pub targets: Vec<String>,
    pub kpis: Kpis,
    pub contributions: ContributionSpectrum,
    pub svd: Vec<SvdDiagnostics>,
    pub transfer_functions: TransferFunctionTable,
    pub response: ResponseComparison,
    pub accuracy: PredictionAccuracyReport,
    pub created_at: DateTime<Utc>,
}
