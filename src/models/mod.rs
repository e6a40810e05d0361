//! Reference spatiotemporal models.
//!
//! [`BrownianMotionModel`] is small enough to simulate quickly and rich
//! enough (spatial correlation, missing data) to exercise the filter.

pub mod brownian;

pub use brownian::{BrownianMotionModel, BM_PARAM_NAMES};
