//! Numerical utilities for the bagged filter.
//!
//! Everything here is a pure function: log-mean-exp, density flooring,
//! sample quantiles and replicate-axis reindexing.

use nalgebra::DMatrix;

/// Numerically stable `log(mean(exp(v)))`.
///
/// Computed as `log(mean(exp(v - max))) + max`, so one huge entry next to
/// very negative ones neither overflows nor underflows. Returns
/// `-inf` for an empty slice or when every entry is `-inf`.
pub fn logmeanexp(values: &[f64]) -> f64 {
    logmeanexp_iter(values.iter().copied())
}

/// [`logmeanexp`] over any cloneable iterator (e.g. a matrix row).
pub fn logmeanexp_iter<I>(values: I) -> f64
where
    I: Iterator<Item = f64> + Clone,
{
    let mut n = 0usize;
    let mut max = f64::NEG_INFINITY;
    for v in values.clone() {
        n += 1;
        if v > max {
            max = v;
        }
    }
    if n == 0 || max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = values.map(|v| (v - max).exp()).sum();
    (sum / n as f64).ln() + max
}

/// Replace every non-finite entry of a log-density matrix by `log_tol`.
///
/// Finite entries are untouched, so flooring twice is the same as flooring
/// once. Returns the number of replaced entries.
pub fn floor_log_densities(log_densities: &mut DMatrix<f64>, log_tol: f64) -> usize {
    let mut replaced = 0;
    for v in log_densities.iter_mut() {
        if !v.is_finite() {
            *v = log_tol;
            replaced += 1;
        }
    }
    replaced
}

/// Sample quantile with linear interpolation between order statistics.
///
/// This is the "type 7" definition: for sorted `x` of length `n`,
/// `h = (n - 1) * p` and the result interpolates between `x[floor(h)]`
/// and `x[floor(h) + 1]`. Returns `None` for an empty sample.
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let p = p.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let frac = h - lo as f64;
    if frac == 0.0 || lo + 1 >= sorted.len() {
        return Some(sorted[lo]);
    }
    Some(sorted[lo] + frac * (sorted[lo + 1] - sorted[lo]))
}

/// Select columns of `matrix` by `permutation`.
///
/// Column `j` of the result is column `permutation[j]` of the input.
/// Indices may repeat; the result has `permutation.len()` columns.
pub fn reindex_columns(matrix: &DMatrix<f64>, permutation: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(matrix.nrows(), permutation.len(), |i, j| {
        matrix[(i, permutation[j])]
    })
}
