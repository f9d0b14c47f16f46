//! Input-side domain types: frequency grids, FRF matrices, operational
//! measurements, and computation request parameters.
//!
//! These types are intentionally lightweight and validated at construction so
//! the numerical pipeline can assume well-formed shapes. Matrices are stored
//! dense (one `DMatrix` per frequency bin) with name→index lookup on the
//! side; keyed maps would be more flexible but the per-bin inversion loop is
//! the hot path and wants contiguous data.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::TpaError;

/// Ordered frequency axis (Hz), strictly increasing, shared by all matrices
/// in one computation.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyGrid(Vec<f64>);

impl FrequencyGrid {
    pub fn new(frequencies: Vec<f64>) -> Result<Self, TpaError> {
        if frequencies.is_empty() {
            return Err(TpaError::InvalidDimension {
                context: "frequency grid".to_string(),
                rows: 0,
                cols: 1,
            });
        }
        if frequencies.iter().any(|f| !f.is_finite()) {
            return Err(TpaError::NonFiniteInput {
                context: "frequency grid".to_string(),
            });
        }
        for pair in frequencies.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TpaError::Config(format!(
                    "frequency grid must be strictly increasing ({} Hz followed by {} Hz)",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(Self(frequencies))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Indices of the bins inside `band`, in frequency order. `None` selects
    /// every bin.
    pub fn band_indices(&self, band: Option<&BandFilter>) -> Vec<usize> {
        match band {
            None => (0..self.0.len()).collect(),
            Some(b) => self
                .0
                .iter()
                .enumerate()
                .filter(|&(_, &f)| f >= b.min_hz && f <= b.max_hz)
                .map(|(i, _)| i)
                .collect(),
        }
    }
}

/// Inclusive frequency band restriction for a computation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandFilter {
    pub min_hz: f64,
    pub max_hz: f64,
}

impl BandFilter {
    pub fn validate(&self) -> Result<(), TpaError> {
        if !(self.min_hz.is_finite() && self.max_hz.is_finite() && self.max_hz > self.min_hz) {
            return Err(TpaError::Config(format!(
                "invalid frequency band filter: [{}, {}] Hz",
                self.min_hz, self.max_hz
            )));
        }
        Ok(())
    }
}

/// Frequency response function dataset: one complex matrix per frequency bin,
/// rows = target channels, columns = transmission paths.
///
/// Invariants enforced at construction: one matrix per grid bin, identical
/// dimensions across bins, unique path labels.
#[derive(Debug, Clone)]
pub struct FrfMatrix {
    grid: FrequencyGrid,
    targets: Vec<String>,
    paths: Vec<String>,
    bins: Vec<DMatrix<Complex64>>,
}

impl FrfMatrix {
    pub fn new(
        grid: FrequencyGrid,
        targets: Vec<String>,
        paths: Vec<String>,
        bins: Vec<DMatrix<Complex64>>,
    ) -> Result<Self, TpaError> {
        if targets.is_empty() || paths.is_empty() {
            return Err(TpaError::InvalidDimension {
                context: "FRF matrix".to_string(),
                rows: targets.len(),
                cols: paths.len(),
            });
        }
        if bins.len() != grid.len() {
            return Err(TpaError::DimensionMismatch {
                context: "FRF bins vs frequency grid".to_string(),
                expected: grid.len().to_string(),
                actual: bins.len().to_string(),
            });
        }
        for (i, bin) in bins.iter().enumerate() {
            if bin.nrows() != targets.len() || bin.ncols() != paths.len() {
                return Err(TpaError::DimensionMismatch {
                    context: format!("FRF matrix shape at bin {i}"),
                    expected: format!("{}x{}", targets.len(), paths.len()),
                    actual: format!("{}x{}", bin.nrows(), bin.ncols()),
                });
            }
        }
        let unique: HashSet<&str> = paths.iter().map(String::as_str).collect();
        if unique.len() != paths.len() {
            return Err(TpaError::Config(
                "path labels must be unique within an FRF dataset".to_string(),
            ));
        }
        Ok(Self {
            grid,
            targets,
            paths,
            bins,
        })
    }

    pub fn grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn bin(&self, index: usize) -> &DMatrix<Complex64> {
        &self.bins[index]
    }

    pub fn target_index(&self, name: &str) -> Option<usize> {
        self.targets.iter().position(|t| t == name)
    }
}

/// Measured operational response: one complex vector per frequency bin, one
/// entry per target channel, on the same grid and channel ordering as the
/// associated [`FrfMatrix`].
#[derive(Debug, Clone)]
pub struct OperationalVector {
    grid: FrequencyGrid,
    targets: Vec<String>,
    bins: Vec<DVector<Complex64>>,
}

impl OperationalVector {
    pub fn new(
        grid: FrequencyGrid,
        targets: Vec<String>,
        bins: Vec<DVector<Complex64>>,
    ) -> Result<Self, TpaError> {
        if targets.is_empty() {
            return Err(TpaError::InvalidDimension {
                context: "operational measurement".to_string(),
                rows: 0,
                cols: 1,
            });
        }
        if bins.len() != grid.len() {
            return Err(TpaError::DimensionMismatch {
                context: "operational bins vs frequency grid".to_string(),
                expected: grid.len().to_string(),
                actual: bins.len().to_string(),
            });
        }
        for (i, bin) in bins.iter().enumerate() {
            if bin.len() != targets.len() {
                return Err(TpaError::DimensionMismatch {
                    context: format!("operational vector length at bin {i}"),
                    expected: targets.len().to_string(),
                    actual: bin.len().to_string(),
                });
            }
        }
        Ok(Self {
            grid,
            targets,
            bins,
        })
    }

    pub fn grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn bin(&self, index: usize) -> &DVector<Complex64> {
        &self.bins[index]
    }
}

/// How many singular values to retain when inverting a bin matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationSpec {
    /// Retain `ceil(count * pct / 100)` singular values, clamped to
    /// `[1, count]`. `pct` must lie in `(0, 100]`.
    Percentage(f64),
    /// Retain the smallest rank whose cumulative squared singular values
    /// reach this fraction of total energy. Must lie in `(0, 1]`.
    Energy(f64),
}

impl TruncationSpec {
    pub fn validate(&self) -> Result<(), TpaError> {
        match *self {
            TruncationSpec::Percentage(pct) => {
                if !(pct.is_finite() && pct > 0.0 && pct <= 100.0) {
                    return Err(TpaError::Config(format!(
                        "truncation percentage must be in (0, 100], got {pct}"
                    )));
                }
            }
            TruncationSpec::Energy(threshold) => {
                if !(threshold.is_finite() && threshold > 0.0 && threshold <= 1.0) {
                    return Err(TpaError::Config(format!(
                        "truncation energy threshold must be in (0, 1], got {threshold}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A named frequency sub-band used for accuracy bucketing.
///
/// A bin belongs to the band when `min_hz <= f < max_hz`; the *last* band of
/// a set also includes its upper edge, so contiguous bands partition a grid
/// with no bin dropped or counted twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyBand {
    pub name: String,
    pub min_hz: f64,
    pub max_hz: f64,
}

impl AccuracyBand {
    pub fn new(name: &str, min_hz: f64, max_hz: f64) -> Self {
        Self {
            name: name.to_string(),
            min_hz,
            max_hz,
        }
    }
}

/// Numerical tuning knobs. All thresholds are parameters, not magic
/// constants, and are echoed in the computation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTuning {
    /// Condition number separating `Good` from `Poor` inversions.
    pub condition_threshold: f64,
    /// Absolute floor below which a singular value is treated as zero.
    pub epsilon_abs: f64,
    /// Relative floor (times the largest singular value of the bin).
    pub epsilon_rel: f64,
    /// Bins whose measured-response magnitude falls below this floor are
    /// excluded from accuracy aggregation (and flagged in the output).
    pub measured_floor: f64,
    /// Named sub-bands for the prediction-accuracy report.
    pub accuracy_bands: Vec<AccuracyBand>,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            condition_threshold: 15.0,
            epsilon_abs: 1e-12,
            epsilon_rel: 1e-10,
            measured_floor: 1e-12,
            accuracy_bands: vec![
                AccuracyBand::new("low", 20.0, 200.0),
                AccuracyBand::new("mid", 200.0, 1000.0),
                AccuracyBand::new("high", 1000.0, 10000.0),
            ],
        }
    }
}

impl EngineTuning {
    pub fn validate(&self) -> Result<(), TpaError> {
        if !(self.condition_threshold.is_finite() && self.condition_threshold > 1.0) {
            return Err(TpaError::Config(format!(
                "condition threshold must be finite and > 1, got {}",
                self.condition_threshold
            )));
        }
        if !(self.epsilon_abs.is_finite() && self.epsilon_abs >= 0.0) {
            return Err(TpaError::Config("epsilon_abs must be >= 0".to_string()));
        }
        if !(self.epsilon_rel.is_finite() && self.epsilon_rel >= 0.0) {
            return Err(TpaError::Config("epsilon_rel must be >= 0".to_string()));
        }
        if !(self.measured_floor.is_finite() && self.measured_floor >= 0.0) {
            return Err(TpaError::Config("measured_floor must be >= 0".to_string()));
        }
        for band in &self.accuracy_bands {
            if !(band.min_hz.is_finite() && band.max_hz.is_finite() && band.max_hz > band.min_hz) {
                return Err(TpaError::Config(format!(
                    "invalid accuracy band '{}': [{}, {}] Hz",
                    band.name, band.min_hz, band.max_hz
                )));
            }
        }
        Ok(())
    }
}

/// One computation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpaComputationParams {
    /// Restrict the analysis to a frequency sub-band. Bins outside the band
    /// are omitted from the output entirely, not zeroed-and-kept.
    pub frequency_band: Option<BandFilter>,
    /// Restrict to a single target channel by name. The FRF is row-restricted
    /// to that channel before inversion, which changes the achievable rank.
    pub target: Option<String>,
    pub truncation: TruncationSpec,
    pub tuning: EngineTuning,
}

impl TpaComputationParams {
    pub fn validate(&self) -> Result<(), TpaError> {
        self.truncation.validate()?;
        if let Some(band) = &self.frequency_band {
            band.validate()?;
        }
        self.tuning.validate()
    }
}

impl Default for TpaComputationParams {
    fn default() -> Self {
        Self {
            frequency_band: None,
            target: None,
            truncation: TruncationSpec::Percentage(100.0),
            tuning: EngineTuning::default(),
        }
    }
}
