//! Parameter swarm and replicate bookkeeping.
//!
//! Replicates are laid out in contiguous blocks: replicates
//! `k * R .. (k + 1) * R` belong to parameter group `k`, where `R` is the
//! number of replicates per group. Every reordering is expressed as a
//! group order expanded to replicate granularity with
//! [`expand_to_replicates`], which keeps the layout intact.

use std::ops::Range;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::traits::ParameterTransform;
use crate::common::utils::reindex_columns;

/// Parameter vectors on the estimation scale, one column per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSwarm {
    values: DMatrix<f64>,
    reps_per_param: usize,
}

impl ParameterSwarm {
    /// Create a swarm from a `params × groups` matrix.
    pub fn new(values: DMatrix<f64>, reps_per_param: usize) -> Self {
        Self {
            values,
            reps_per_param,
        }
    }

    /// `num_groups` copies of the same estimation-scale point.
    pub fn replicate(start: &DVector<f64>, num_groups: usize, reps_per_param: usize) -> Self {
        let values = DMatrix::from_fn(start.len(), num_groups, |i, _| start[i]);
        Self::new(values, reps_per_param)
    }

    /// Number of parameter groups.
    #[inline]
    pub fn num_groups(&self) -> usize {
        self.values.ncols()
    }

    /// Dimension of each parameter vector.
    #[inline]
    pub fn num_params(&self) -> usize {
        self.values.nrows()
    }

    /// Replicates per group.
    #[inline]
    pub fn reps_per_param(&self) -> usize {
        self.reps_per_param
    }

    /// Total replicates across all groups.
    #[inline]
    pub fn total_reps(&self) -> usize {
        self.num_groups() * self.reps_per_param
    }

    /// Estimation-scale values (`params × groups`).
    #[inline]
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Mutable estimation-scale values.
    #[inline]
    pub fn values_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.values
    }

    /// Parameter vector of group `k`.
    pub fn group(&self, k: usize) -> DVector<f64> {
        self.values.column(k).into_owned()
    }

    /// Replicate index range owned by group `k`.
    #[inline]
    pub fn block(&self, k: usize) -> Range<usize> {
        block_range(k, self.reps_per_param)
    }

    /// Group owning replicate `rep`.
    #[inline]
    pub fn group_of(&self, rep: usize) -> usize {
        rep / self.reps_per_param
    }

    /// Mean parameter vector on the estimation scale.
    pub fn mean(&self) -> DVector<f64> {
        self.values.column_mean()
    }

    /// Natural-scale parameters, one column per group.
    pub fn to_natural<T: ParameterTransform + ?Sized>(&self, transform: &T) -> DMatrix<f64> {
        transform.columns_to_natural_scale(&self.values)
    }

    /// New swarm whose group `j` is group `order[j]` of this one.
    pub fn reorder(&self, order: &[usize]) -> Self {
        Self::new(reindex_columns(&self.values, order), self.reps_per_param)
    }
}

/// Replicate range of group `k` with `reps_per_param` replicates each.
#[inline]
pub fn block_range(k: usize, reps_per_param: usize) -> Range<usize> {
    k * reps_per_param..(k + 1) * reps_per_param
}

/// Expand a group order to a replicate order by repeating blocks.
///
/// Group `order[j]` contributes its whole block, in place, to slot `j`.
pub fn expand_to_replicates(order: &[usize], reps_per_param: usize) -> Vec<usize> {
    order
        .iter()
        .flat_map(|&k| block_range(k, reps_per_param))
        .collect()
}

/// Whether a replicate order moves whole blocks only.
///
/// True when every slot `j` holds a replicate at the same offset inside
/// a single source block, i.e. replicate `i` of the result belongs to
/// group `i / R` and the reorder kept within-block positions.
pub fn is_block_order(replicate_order: &[usize], reps_per_param: usize) -> bool {
    if reps_per_param == 0 || replicate_order.len() % reps_per_param != 0 {
        return false;
    }
    replicate_order
        .chunks(reps_per_param)
        .all(|chunk| {
            let src = chunk[0] / reps_per_param;
            chunk
                .iter()
                .enumerate()
                .all(|(offset, &r)| r == src * reps_per_param + offset)
        })
}

/// Natural-scale parameters repeated once per replicate of one group.
pub fn replicate_columns(params: &DVector<f64>, reps: usize) -> DMatrix<f64> {
    DMatrix::from_fn(params.len(), reps, |i, _| params[i])
}
