//! Cooling schedules for the parameter random walk.
//!
//! The multiplier `alpha(t, m)` scales the random-walk standard deviation
//! at observation `t` of outer iteration `m` (both 1-based). It decays
//! with the combined progress `t / T + m - 1`, measured in iterations, and
//! reaches the configured fraction after 50 iterations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{IubfError, IubfResult};
use crate::common::constants::{COOLING_HALF_STEPS, DEFAULT_COOLING_FRACTION};

/// Decay family of the cooling multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoolingKind {
    /// `alpha = c^(progress / 50)`
    Geometric,
    /// Reciprocal decay `(1 + s) / (s + t + T (m - 1))`
    Hyperbolic,
}

impl FromStr for CoolingKind {
    type Err = IubfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geometric" => Ok(CoolingKind::Geometric),
            "hyperbolic" => Ok(CoolingKind::Hyperbolic),
            other => Err(IubfError::config(
                "cooling.type",
                format!(
                    "unrecognized cooling type '{other}' \
                     (expected 'geometric' or 'hyperbolic')"
                ),
            )),
        }
    }
}

impl fmt::Display for CoolingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoolingKind::Geometric => write!(f, "geometric"),
            CoolingKind::Hyperbolic => write!(f, "hyperbolic"),
        }
    }
}

/// Cooling kind plus the fraction reached after 50 iterations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoolingSchedule {
    /// Decay family
    pub kind: CoolingKind,
    /// Multiplier after 50 iterations, in (0, 1]
    pub fraction: f64,
}

impl CoolingSchedule {
    /// Create a schedule.
    pub fn new(kind: CoolingKind, fraction: f64) -> Self {
        Self { kind, fraction }
    }

    /// Geometric schedule reaching `fraction` after 50 iterations.
    pub fn geometric(fraction: f64) -> Self {
        Self::new(CoolingKind::Geometric, fraction)
    }

    /// Hyperbolic schedule reaching `fraction` after 50 iterations.
    pub fn hyperbolic(fraction: f64) -> Self {
        Self::new(CoolingKind::Hyperbolic, fraction)
    }

    /// Check the fraction is in (0, 1].
    pub fn validate(&self) -> IubfResult<()> {
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(IubfError::config(
                "cooling.fraction.50",
                format!("must be in (0, 1], got {}", self.fraction),
            ));
        }
        Ok(())
    }

    /// Multiplier at 1-based time `t` of `num_times`, 1-based iteration `m`.
    pub fn alpha(&self, t: usize, m: usize, num_times: usize) -> f64 {
        let n = num_times.max(1) as f64;
        let t = t as f64;
        let m = m.max(1) as f64;
        match self.kind {
            CoolingKind::Geometric => {
                let progress = t / n + m - 1.0;
                self.fraction.powf(progress / COOLING_HALF_STEPS)
            }
            CoolingKind::Hyperbolic => {
                if self.fraction >= 1.0 {
                    return 1.0;
                }
                let scale = (COOLING_HALF_STEPS * n * self.fraction - 1.0) / (1.0 - self.fraction);
                (1.0 + scale) / (scale + t + n * (m - 1.0))
            }
        }
    }
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        Self::geometric(DEFAULT_COOLING_FRACTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("geometric".parse::<CoolingKind>().unwrap(), CoolingKind::Geometric);
        assert_eq!("Hyperbolic".parse::<CoolingKind>().unwrap(), CoolingKind::Hyperbolic);
        let err = "linear".parse::<CoolingKind>().unwrap_err();
        assert!(matches!(err, IubfError::Configuration { setting: "cooling.type", .. }));
    }

    #[test]
    fn test_geometric_reaches_fraction_after_50_iterations() {
        let c = CoolingSchedule::geometric(0.1);
        let t_total = 20;
        // progress = t/T + m - 1 = 50 at t = T, m = 50
        let a = c.alpha(t_total, 50, t_total);
        assert!((a - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_hyperbolic_reaches_fraction_after_50_iterations() {
        let c = CoolingSchedule::hyperbolic(0.2);
        let t_total = 10;
        // One full iteration past the first: t = T, m = 50 means T*50 steps
        let a = c.alpha(t_total, 50, t_total);
        let n = t_total as f64;
        let s = (50.0 * n * 0.2 - 1.0) / 0.8;
        assert!((a - (1.0 + s) / (s + 50.0 * n)).abs() < 1e-12);
        assert!((a - 0.2).abs() < 0.01);
    }

    #[test]
    fn test_alpha_is_non_increasing_and_bounded() {
        for schedule in [CoolingSchedule::geometric(0.3), CoolingSchedule::hyperbolic(0.3)] {
            let t_total = 7;
            let mut prev = f64::INFINITY;
            for m in 1..=5 {
                for t in 1..=t_total {
                    let a = schedule.alpha(t, m, t_total);
                    assert!(a > 0.0 && a <= 1.0);
                    assert!(a <= prev);
                    prev = a;
                }
            }
        }
    }

    #[test]
    fn test_fraction_one_disables_cooling() {
        assert_eq!(CoolingSchedule::hyperbolic(1.0).alpha(3, 9, 5), 1.0);
        assert_eq!(CoolingSchedule::geometric(1.0).alpha(3, 9, 5), 1.0);
    }

    #[test]
    fn test_validate_fraction() {
        assert!(CoolingSchedule::geometric(0.0).validate().is_err());
        assert!(CoolingSchedule::geometric(1.5).validate().is_err());
        assert!(CoolingSchedule::geometric(f64::NAN).validate().is_err());
        assert!(CoolingSchedule::geometric(1.0).validate().is_ok());
    }
}
