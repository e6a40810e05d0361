//! Random-walk perturbation of the parameter swarm.

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Add `N(0, (alpha * sd[i])^2)` noise to every coordinate `i` of every group.
///
/// `values` is `params × groups` on the estimation scale and `sd` has one
/// entry per parameter. Coordinates with a zero sd draw nothing and are
/// left bit-identical.
pub fn perturb_parameters<R: Rng + ?Sized>(
    values: &mut DMatrix<f64>,
    sd: &[f64],
    alpha: f64,
    rng: &mut R,
) {
    debug_assert_eq!(sd.len(), values.nrows());
    for mut group in values.column_iter_mut() {
        for (i, &s) in sd.iter().enumerate() {
            if s == 0.0 {
                continue;
            }
            let z: f64 = StandardNormal.sample(rng);
            group[i] += alpha * s * z;
        }
    }
}
