//! Neighborhood-weighted likelihood combination.
//!
//! For each unit the neighborhood's conditional densities, current and
//! past, are summed on the log scale into a local predictive weight. A
//! parameter group's resampling weight for one observation time is
//!
//! ```text
//! sum_u logmeanexp(local[u] + logCD[u]) - sum_u logmeanexp(local[u])
//! ```
//!
//! with the log-mean-exp taken over the group's replicates. With empty
//! neighborhoods this is the group's bootstrap-filter likelihood,
//! `sum_u logmeanexp(logCD[u])`.

use std::ops::Range;

use nalgebra::{DMatrix, DVector};
use smallvec::SmallVec;

use super::errors::{IubfError, IubfResult};
use super::history::HistoryBuffer;
use super::neighborhood::Neighborhood;
use crate::common::utils::{logmeanexp, logmeanexp_iter};

/// One unit's neighborhood split by time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitNeighbors {
    /// Units at the current time
    pub current: SmallVec<[usize; 8]>,
    /// `(unit, lag)` pairs in the past, `lag >= 1`
    pub past: SmallVec<[(usize, usize); 8]>,
}

/// Validated neighborhoods of every unit at one observation time.
///
/// Resolved once per time step and shared read-only by all group tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalNeighborhoods {
    units: Vec<SplitNeighbors>,
}

impl LocalNeighborhoods {
    /// Query and validate the neighborhoods at `time`.
    ///
    /// Fails when a neighbor names an unknown unit, a future time, or a
    /// past time the history buffer no longer holds.
    pub fn resolve<N: Neighborhood + ?Sized>(
        neighborhood: &N,
        time: usize,
        num_units: usize,
        history_depth: usize,
    ) -> IubfResult<Self> {
        let mut units = Vec::with_capacity(num_units);
        for unit in 0..num_units {
            let mut split = SplitNeighbors::default();
            for (nu, nt) in neighborhood.neighbors(time, unit) {
                if nu >= num_units {
                    return Err(IubfError::Neighborhood {
                        time,
                        unit,
                        reason: format!(
                            "neighbor unit {nu} out of range (num_units = {num_units})"
                        ),
                    });
                }
                if nt > time {
                    return Err(IubfError::Neighborhood {
                        time,
                        unit,
                        reason: format!("neighbor time {nt} is in the future"),
                    });
                }
                if nt == time {
                    split.current.push(nu);
                } else {
                    let lag = time - nt;
                    if lag > history_depth {
                        return Err(IubfError::Neighborhood {
                            time,
                            unit,
                            reason: format!(
                                "neighbor time {nt} needs lag {lag} \
                                 but history holds {history_depth}"
                            ),
                        });
                    }
                    split.past.push((nu, lag));
                }
            }
            units.push(split);
        }
        Ok(Self { units })
    }

    /// Number of units.
    #[inline]
    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    /// Split neighborhood of `unit`.
    #[inline]
    pub fn unit(&self, unit: usize) -> &SplitNeighbors {
        &self.units[unit]
    }

    /// Local combined predictive log-weight of `unit`, one entry per replicate.
    ///
    /// `log_cd` is the group's `units × R` block; `block` is the group's
    /// replicate range in the full history matrices.
    pub fn local_weight(
        &self,
        unit: usize,
        log_cd: &DMatrix<f64>,
        history: &HistoryBuffer,
        block: &Range<usize>,
    ) -> DVector<f64> {
        let reps = log_cd.ncols();
        let split = &self.units[unit];
        let mut local = DVector::zeros(reps);
        for &nu in &split.current {
            for r in 0..reps {
                local[r] += log_cd[(nu, r)];
            }
        }
        for &(nu, lag) in &split.past {
            // validated against the history depth in `resolve`
            if let Some(past) = history.entry(lag) {
                for r in 0..reps {
                    local[r] += past[(nu, block.start + r)];
                }
            }
        }
        local
    }

    /// Resampling log-weight of one parameter group.
    pub fn group_log_weight(
        &self,
        log_cd: &DMatrix<f64>,
        history: &HistoryBuffer,
        block: &Range<usize>,
    ) -> f64 {
        let reps = log_cd.ncols();
        let mut sum_wm = 0.0;
        let mut sum_wp = 0.0;
        for unit in 0..self.units.len() {
            let local = self.local_weight(unit, log_cd, history, block);
            sum_wm += logmeanexp_iter((0..reps).map(|r| local[r] + log_cd[(unit, r)]));
            sum_wp += logmeanexp(local.as_slice());
        }
        sum_wm - sum_wp
    }
}

/// Log-likelihood increment of one time step from the group weights.
pub fn step_log_likelihood(group_weights: &[f64]) -> f64 {
    logmeanexp(group_weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::neighborhood::{EmptyNeighborhood, LaggedNeighborhood};

    #[test]
    fn test_empty_neighborhood_is_bootstrap_weight() {
        let nb = LocalNeighborhoods::resolve(&EmptyNeighborhood, 0, 2, 0).unwrap();
        let log_cd = DMatrix::from_row_slice(2, 3, &[-1.0, -2.0, -3.0, 0.5, -0.5, 0.0]);
        let w = nb.group_log_weight(&log_cd, &HistoryBuffer::new(), &(0..3));
        let expected = logmeanexp(&[-1.0, -2.0, -3.0]) + logmeanexp(&[0.5, -0.5, 0.0]);
        assert!((w - expected).abs() < 1e-12);
    }

    #[test]
    fn test_current_and_past_neighbors() {
        // 2 units, 2 replicates per group, group 1 occupies replicates 2..4
        let history = HistoryBuffer::new().advance(
            DMatrix::from_row_slice(2, 4, &[9.0, 9.0, -0.2, -0.4, 9.0, 9.0, -1.0, -0.1]),
            1,
            &[0, 1, 2, 3],
        );
        let nb = LocalNeighborhoods::resolve(&LaggedNeighborhood::new(1, 1), 1, 2, 1).unwrap();
        let log_cd = DMatrix::from_row_slice(2, 2, &[-0.3, -0.6, -0.7, -0.2]);
        let block = 2..4;
        assert!(nb.unit(0).current.is_empty());
        assert_eq!(nb.unit(0).past.as_slice(), &[(0, 1)]);
        assert_eq!(nb.unit(1).current.as_slice(), &[0]);
        assert_eq!(nb.unit(1).past.as_slice(), &[(1, 1)]);

        // unit 0: past (0, lag 1) only
        let l0 = nb.local_weight(0, &log_cd, &history, &block);
        assert_eq!(l0.as_slice(), &[-0.2, -0.4]);
        // unit 1: past (1, lag 1) + current unit 0
        let l1 = nb.local_weight(1, &log_cd, &history, &block);
        assert!((l1[0] - (-1.0 - 0.3)).abs() < 1e-12);
        assert!((l1[1] - (-0.1 - 0.6)).abs() < 1e-12);

        let w = nb.group_log_weight(&log_cd, &history, &block);
        let expected = logmeanexp(&[-0.2 - 0.3, -0.4 - 0.6]) - logmeanexp(&[-0.2, -0.4])
            + logmeanexp(&[-1.3 - 0.7, -0.7 - 0.2])
            - logmeanexp(&[-1.3, -0.7]);
        assert!((w - expected).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_rejects_bad_neighbors() {
        let future = |t: usize, u: usize| vec![(u, t + 1)];
        assert!(matches!(
            LocalNeighborhoods::resolve(&future, 0, 1, 0),
            Err(IubfError::Neighborhood { .. })
        ));
        let bad_unit = |t: usize, _u: usize| vec![(5, t)];
        assert!(LocalNeighborhoods::resolve(&bad_unit, 0, 2, 0).is_err());
        let too_old = |t: usize, u: usize| if t >= 2 { vec![(u, t - 2)] } else { vec![] };
        assert!(LocalNeighborhoods::resolve(&too_old, 2, 1, 1).is_err());
        assert!(LocalNeighborhoods::resolve(&too_old, 2, 1, 2).is_ok());
    }

    #[test]
    fn test_step_log_likelihood() {
        let w = [-1.0, -2.0, -0.5];
        let naive = (w.iter().map(|x: &f64| x.exp()).sum::<f64>() / 3.0).ln();
        assert!((step_log_likelihood(&w) - naive).abs() < 1e-12);
    }
}
