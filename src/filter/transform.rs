//! Stock parameter transforms.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::traits::ParameterTransform;

/// Leaves parameters untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl ParameterTransform for IdentityTransform {
    fn to_estimation_scale(&self, natural: &DVector<f64>) -> DVector<f64> {
        natural.clone()
    }

    fn to_natural_scale(&self, estimation: &DVector<f64>) -> DVector<f64> {
        estimation.clone()
    }
}

/// Scale of a single parameter coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Unconstrained real
    Identity,
    /// Positive real, estimated as `ln(x)`
    Log,
    /// Value in (0, 1), estimated as `ln(x / (1 - x))`
    Logit,
}

impl Scale {
    #[inline]
    fn forward(self, x: f64) -> f64 {
        match self {
            Scale::Identity => x,
            Scale::Log => x.ln(),
            Scale::Logit => (x / (1.0 - x)).ln(),
        }
    }

    #[inline]
    fn inverse(self, y: f64) -> f64 {
        match self {
            Scale::Identity => y,
            Scale::Log => y.exp(),
            Scale::Logit => 1.0 / (1.0 + (-y).exp()),
        }
    }
}

/// Per-coordinate transform.
///
/// Coordinates beyond `scales.len()` are left on the identity scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    scales: Vec<Scale>,
}

impl CoordinateTransform {
    /// Create a transform from one scale per coordinate.
    pub fn new(scales: Vec<Scale>) -> Self {
        Self { scales }
    }

    /// Scale of coordinate `i`.
    #[inline]
    pub fn scale(&self, i: usize) -> Scale {
        self.scales.get(i).copied().unwrap_or(Scale::Identity)
    }
}

impl ParameterTransform for CoordinateTransform {
    fn to_estimation_scale(&self, natural: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            natural.len(),
            natural.iter().enumerate().map(|(i, &x)| self.scale(i).forward(x)),
        )
    }

    fn to_natural_scale(&self, estimation: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            estimation.len(),
            estimation.iter().enumerate().map(|(i, &y)| self.scale(i).inverse(y)),
        )
    }
}
