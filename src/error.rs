//! Error taxonomy for the engine and its CLI boundary.
//!
//! The engine distinguishes a small set of failure kinds so a boundary layer
//! (CLI today, an HTTP handler tomorrow) can translate them into a structured
//! response (kind + human message) instead of fabricating plausible-looking
//! numbers on failure.
//!
//! `InvalidDimension`, `NonFiniteInput`, `DimensionMismatch`, and
//! `ComputationCancelled` are fatal: they abort a whole request with no
//! partial output. Ill-conditioned bins are *not* errors — they degrade to a
//! flagged rank-1 inversion inside the engine (see `math::truncation`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable classification, stable across message wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidDimension,
    NonFiniteInput,
    DimensionMismatch,
    ComputationCancelled,
    Storage,
    Config,
    Io,
    Json,
}

/// All failures surfaced by this crate.
#[derive(Debug, Error)]
pub enum TpaError {
    /// A matrix or vector has a zero dimension where at least one row and
    /// one column are required.
    #[error("invalid dimension: {context} has shape {rows}x{cols}")]
    InvalidDimension {
        context: String,
        rows: usize,
        cols: usize,
    },

    /// Input data contains NaN or infinite entries.
    #[error("non-finite input: {context}")]
    NonFiniteInput { context: String },

    /// FRF and operational data disagree on the frequency grid or the
    /// target-channel layout.
    #[error("dimension mismatch: {context} (expected {expected}, got {actual})")]
    DimensionMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// The caller aborted an in-flight computation. Partial per-bin results
    /// are discarded.
    #[error("computation cancelled")]
    ComputationCancelled,

    /// A referenced dataset, measurement, or result does not exist.
    #[error("storage: {0}")]
    Storage(String),

    /// Bad run configuration (CLI arguments, tuning values, filters).
    #[error("config: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TpaError {
    /// Classification for structured error responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TpaError::InvalidDimension { .. } => ErrorKind::InvalidDimension,
            TpaError::NonFiniteInput { .. } => ErrorKind::NonFiniteInput,
            TpaError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            TpaError::ComputationCancelled => ErrorKind::ComputationCancelled,
            TpaError::Storage(_) => ErrorKind::Storage,
            TpaError::Config(_) => ErrorKind::Config,
            TpaError::Io { .. } => ErrorKind::Io,
            TpaError::Json { .. } => ErrorKind::Json,
        }
    }

    /// Process exit code for the `tpa` binary.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Config => 2,
            ErrorKind::Storage => 3,
            ErrorKind::InvalidDimension
            | ErrorKind::NonFiniteInput
            | ErrorKind::DimensionMismatch => 4,
            ErrorKind::ComputationCancelled => 5,
            ErrorKind::Io | ErrorKind::Json => 6,
        }
    }
}
