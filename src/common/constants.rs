//! Numerical constants and configuration defaults.
//!
//! Kept separate from [`IubfConfig`](crate::filter::IubfConfig) so tests and
//! models can refer to the same values.

/// Default density floor.
///
/// Conditional densities below this (in particular impossible
/// observations, reported as `-inf` on the log scale) are replaced by
/// `ln(DEFAULT_DENSITY_TOL)` before any combination. `1e-18^17`.
pub const DEFAULT_DENSITY_TOL: f64 = 1e-306;

/// Number of combined (time, iteration) cooling steps after which the
/// perturbation multiplier reaches the configured fraction.
pub const COOLING_HALF_STEPS: f64 = 50.0;

/// Minimum number of parameter groups for elite resampling to be meaningful.
pub const MIN_PARAM_GROUPS: usize = 3;

/// Default proportion of parameter groups kept as the elite set.
pub const DEFAULT_ELITE_PROPORTION: f64 = 0.5;

/// Default cooling fraction after 50 iterations.
pub const DEFAULT_COOLING_FRACTION: f64 = 0.5;

/// Default seed for the master RNG.
pub const DEFAULT_SEED: u64 = 42;
