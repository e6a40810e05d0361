//! Deterministic test models shared across integration tests.

#![allow(dead_code)]

use nalgebra::DMatrix;
use rand::Rng;

use iubf::filter::{ModelError, SpatialModel};

/// Deterministic model with one state per unit.
///
/// - initial state of every unit = first parameter of the replicate
/// - each transition adds `step * j` to replicate column `j`
/// - `log f(y | x) = -(y - x)^2 / 2`, per unit
///
/// Densities at `impossible_at` are `-inf`; any call at `fail_at` errors.
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    pub num_units: usize,
    pub observations: DMatrix<f64>,
    pub step: f64,
    pub impossible_at: Option<usize>,
    pub fail_at: Option<usize>,
    times: Vec<f64>,
    names: Vec<String>,
}

impl ScriptedModel {
    /// `observations` is `units × times`.
    pub fn new(observations: DMatrix<f64>, step: f64) -> Self {
        let times = (1..=observations.ncols()).map(|t| t as f64).collect();
        Self {
            num_units: observations.nrows(),
            observations,
            step,
            impossible_at: None,
            fail_at: None,
            times,
            names: vec!["a".to_string()],
        }
    }

    fn time_index(&self, to_time: f64) -> usize {
        self.times.iter().position(|&t| t == to_time).unwrap_or(0)
    }
}

impl SpatialModel for ScriptedModel {
    fn num_units(&self) -> usize {
        self.num_units
    }

    fn state_dim(&self) -> usize {
        self.num_units
    }

    fn param_names(&self) -> &[String] {
        &self.names
    }

    fn t0(&self) -> f64 {
        0.0
    }

    fn times(&self) -> &[f64] {
        &self.times
    }

    fn sample_initial_state<R: Rng + ?Sized>(
        &self,
        params: &DMatrix<f64>,
        _rng: &mut R,
    ) -> Result<DMatrix<f64>, ModelError> {
        if self.fail_at == Some(0) {
            return Err(ModelError::Initialization("scripted failure".into()));
        }
        Ok(DMatrix::from_fn(self.num_units, params.ncols(), |_, j| params[(0, j)]))
    }

    fn advance_state<R: Rng + ?Sized>(
        &self,
        states: &DMatrix<f64>,
        _params: &DMatrix<f64>,
        _from_time: f64,
        to_time: f64,
        _rng: &mut R,
    ) -> Result<DMatrix<f64>, ModelError> {
        let t = self.time_index(to_time);
        if t > 0 && self.fail_at == Some(t) {
            return Err(ModelError::Process(format!("scripted failure at {t}")));
        }
        Ok(DMatrix::from_fn(states.nrows(), states.ncols(), |u, j| {
            states[(u, j)] + self.step * j as f64
        }))
    }

    fn conditional_log_density(
        &self,
        states: &DMatrix<f64>,
        _params: &DMatrix<f64>,
        time_index: usize,
    ) -> Result<DMatrix<f64>, ModelError> {
        if self.impossible_at == Some(time_index) {
            return Ok(DMatrix::from_element(self.num_units, states.ncols(), f64::NEG_INFINITY));
        }
        Ok(DMatrix::from_fn(self.num_units, states.ncols(), |u, j| {
            let d = self.observations[(u, time_index)] - states[(u, j)];
            -0.5 * d * d
        }))
    }
}
