//! Numerical kernel: complex SVD, truncated pseudo-inversion, and the
//! truncation policy that picks how many singular values survive.

pub mod svd;
pub mod truncation;

pub use svd::*;
pub use truncation::*;
