//! Capability traits the filter consumes.
//!
//! The bagged filter never simulates or evaluates anything itself. It is
//! handed a [`SpatialModel`] (initializer, process simulator, per-unit
//! measurement density) and a [`ParameterTransform`] between the natural
//! and the estimation scale. The spatial topology lives in
//! [`Neighborhood`](super::neighborhood::Neighborhood).

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use super::errors::ModelError;

/// A spatiotemporal partially observed Markov process.
///
/// Replicates are stored as columns. Every matrix-valued method receives
/// one parameter column per replicate, on the natural scale, so a model
/// may be simulated for mixed parameter values in one call. The filter
/// calls the model once per parameter group and observation time.
///
/// Times are indexed from 0; `times()[t]` is the time of observation `t`
/// and the process starts at `t0()`.
pub trait SpatialModel: Send + Sync {
    /// Number of spatial units.
    fn num_units(&self) -> usize;

    /// Rows of a state column.
    fn state_dim(&self) -> usize;

    /// Names of the model parameters, in vector order.
    fn param_names(&self) -> &[String];

    /// Number of model parameters.
    fn num_params(&self) -> usize {
        self.param_names().len()
    }

    /// Time at which the initial state is defined.
    fn t0(&self) -> f64;

    /// Observation times.
    fn times(&self) -> &[f64];

    /// Number of observation times.
    fn num_times(&self) -> usize {
        self.times().len()
    }

    /// Draw initial states, one column per column of `params`.
    fn sample_initial_state<R: Rng + ?Sized>(
        &self,
        params: &DMatrix<f64>,
        rng: &mut R,
    ) -> Result<DMatrix<f64>, ModelError>;

    /// Simulate every replicate from `from_time` to `to_time`.
    ///
    /// May be stochastic and may take internal sub-steps.
    fn advance_state<R: Rng + ?Sized>(
        &self,
        states: &DMatrix<f64>,
        params: &DMatrix<f64>,
        from_time: f64,
        to_time: f64,
        rng: &mut R,
    ) -> Result<DMatrix<f64>, ModelError>;

    /// Log density of observation `time_index` given each replicate.
    ///
    /// Returns a `num_units × replicates` matrix. `-inf` is a legitimate
    /// value for an impossible observation.
    fn conditional_log_density(
        &self,
        states: &DMatrix<f64>,
        params: &DMatrix<f64>,
        time_index: usize,
    ) -> Result<DMatrix<f64>, ModelError>;
}

/// Bijective reparameterization between natural and estimation scales.
///
/// The random walk runs on the estimation scale; the model only ever sees
/// natural-scale values.
pub trait ParameterTransform: Send + Sync {
    /// Natural scale to estimation scale.
    fn to_estimation_scale(&self, natural: &DVector<f64>) -> DVector<f64>;

    /// Estimation scale to natural scale.
    fn to_natural_scale(&self, estimation: &DVector<f64>) -> DVector<f64>;

    /// Column-wise [`to_natural_scale`](Self::to_natural_scale).
    fn columns_to_natural_scale(&self, estimation: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = estimation.clone();
        for (j, col) in estimation.column_iter().enumerate() {
            out.set_column(j, &self.to_natural_scale(&col.into_owned()));
        }
        out
    }
}
