//! Spatiotemporal neighborhoods.
//!
//! A neighborhood maps `(time, unit)` to the `(unit, time)` pairs whose
//! conditional densities make up that unit's local predictive weight.
//! Every returned time must be `<= time`. The unit's own entry at the
//! current time is normally excluded: it is the quantity being predicted.

use smallvec::SmallVec;

/// Neighbors of one `(time, unit)`: `(unit, time)` pairs.
pub type NeighborList = SmallVec<[(usize, usize); 8]>;

/// Spatial topology queried by the filter.
pub trait Neighborhood: Send + Sync {
    /// Neighbors of `unit` at observation `time` (0-based).
    fn neighbors(&self, time: usize, unit: usize) -> NeighborList;

    /// Largest lookback any unit needs at `time`: `time - min neighbor time`.
    fn lookback(&self, time: usize, num_units: usize) -> usize {
        (0..num_units)
            .flat_map(|u| self.neighbors(time, u))
            .map(|(_, s)| time.saturating_sub(s))
            .max()
            .unwrap_or(0)
    }
}

impl<F> Neighborhood for F
where
    F: Fn(usize, usize) -> Vec<(usize, usize)> + Send + Sync,
{
    fn neighbors(&self, time: usize, unit: usize) -> NeighborList {
        NeighborList::from_vec(self(time, unit))
    }
}

/// No neighbors: every unit is weighted by its own density alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyNeighborhood;

impl Neighborhood for EmptyNeighborhood {
    fn neighbors(&self, _time: usize, _unit: usize) -> NeighborList {
        NeighborList::new()
    }
}

/// Preceding units at the current time plus the unit's own past.
///
/// Unit `u` at time `t` sees `(u - k, t)` for `k = 1..=spatial` (when
/// `u >= k`) and `(u, t - l)` for `l = 1..=lag` (when `t >= l`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaggedNeighborhood {
    /// Number of preceding units at the current time
    pub spatial: usize,
    /// Number of past times of the unit itself
    pub lag: usize,
}

impl LaggedNeighborhood {
    /// Create a neighborhood with the given spatial reach and time lag.
    pub fn new(spatial: usize, lag: usize) -> Self {
        Self { spatial, lag }
    }
}

impl Default for LaggedNeighborhood {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Neighborhood for LaggedNeighborhood {
    fn neighbors(&self, time: usize, unit: usize) -> NeighborList {
        let mut out = NeighborList::new();
        for l in 1..=self.lag.min(time) {
            out.push((unit, time - l));
        }
        for k in 1..=self.spatial.min(unit) {
            out.push((unit - k, time));
        }
        out
    }
}
