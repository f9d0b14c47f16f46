//! Caller-facing cancellation of an in-flight computation.
//!
//! A computation request can be superseded (the operator changes the band
//! filter before the previous run finished), so the caller holds a token and
//! flips it; the engine polls the token before each bin solve and aborts the
//! whole request, discarding partial results.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag. Cloning is cheap and all clones observe the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; takes effect at the next per-bin
    /// poll inside the engine.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
