//! Common utilities shared by the filter components.
//!
//! Numerical helpers (log-mean-exp, density flooring, quantiles, column
//! reindexing), numerical constants and the deterministic RNG.

pub mod constants;
pub mod rng;
pub mod utils;
