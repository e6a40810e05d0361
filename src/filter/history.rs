//! History of past conditional log-densities.
//!
//! Neighborhoods may reach back in time, so the densities of earlier
//! observations must be kept for as long as some unit's neighborhood at
//! the next time still refers to them. The buffer is rebuilt once per
//! time step, after the parallel phase, and every retained entry is
//! reindexed with the same replicate order as the live ensemble so that
//! column `j` of an entry always describes the lineage of replicate `j`.

use nalgebra::DMatrix;

use super::neighborhood::Neighborhood;
use crate::common::utils::reindex_columns;

/// Past `units × replicates` log-density matrices, most recent first.
///
/// `entry(1)` is the previous observation time, `entry(k)` is `k` times back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryBuffer {
    entries: Vec<DMatrix<f64>>,
}

impl HistoryBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of past times retained.
    #[inline]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Densities `lag` observation times back (`lag >= 1`).
    #[inline]
    pub fn entry(&self, lag: usize) -> Option<&DMatrix<f64>> {
        lag.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Buffer for the next time step.
    ///
    /// Keeps `current` followed by the `depth - 1` most recent existing
    /// entries, then reindexes every kept entry by `replicate_order`. A
    /// depth of 0 clears the buffer.
    pub fn advance(self, current: DMatrix<f64>, depth: usize, replicate_order: &[usize]) -> Self {
        if depth == 0 {
            return Self::new();
        }
        let entries = std::iter::once(current)
            .chain(self.entries.into_iter().take(depth - 1))
            .map(|m| reindex_columns(&m, replicate_order))
            .collect();
        Self { entries }
    }
}

/// Depth needed to evaluate every neighborhood at `next_time`.
///
/// The maximum over units of `next_time - min neighbor time`, or 0 when
/// no neighborhood reaches into the past.
pub fn required_depth<N: Neighborhood + ?Sized>(
    neighborhood: &N,
    next_time: usize,
    num_units: usize,
) -> usize {
    neighborhood.lookback(next_time, num_units)
}
