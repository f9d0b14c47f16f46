//! Result artifacts on disk: portable JSON snapshots and CSV exports.

pub mod export;
pub mod result;

pub use export::*;
pub use result::*;
