//! Correlated Brownian motion on a ring of spatial units.
//!
//! `U` units sit on a circle. Between observation times every unit takes a
//! Gaussian increment with variance `sigma^2 * dt`; increments of units
//! `u` and `v` have correlation `rho^d(u,v)`, where `d` is the distance
//! around the circle. Each unit is observed with independent Gaussian noise
//! of standard deviation `tau`. All units start at `x0`.
//!
//! Parameters, in vector order: `[rho, sigma, tau, x0]`, estimated on the
//! logit / log / log / identity scales (see [`BrownianMotionModel::transform`]).

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::filter::errors::{IubfError, IubfResult, ModelError};
use crate::filter::traits::SpatialModel;
use crate::filter::transform::{CoordinateTransform, Scale};

/// Parameter names, in vector order.
pub const BM_PARAM_NAMES: [&str; 4] = ["rho", "sigma", "tau", "x0"];

const RHO: usize = 0;
const SIGMA: usize = 1;
const TAU: usize = 2;
const X0: usize = 3;

/// Largest rho used when advancing. Values past it (a logit-scale walk can
/// round to exactly 1) are clamped so the correlation stays factorizable.
const MAX_RHO: f64 = 1.0 - 1e-8;

/// Correlated Brownian motion model with Gaussian measurements.
#[derive(Debug, Clone)]
pub struct BrownianMotionModel {
    num_units: usize,
    t0: f64,
    times: Vec<f64>,
    /// `units × times`; NaN marks a missing observation
    observations: DMatrix<f64>,
    param_names: Vec<String>,
}

impl BrownianMotionModel {
    /// Create a model around existing observations.
    ///
    /// `observations` is `num_units × times.len()`. Times must be strictly
    /// increasing and after `t0`.
    pub fn new(t0: f64, times: Vec<f64>, observations: DMatrix<f64>) -> IubfResult<Self> {
        let num_units = observations.nrows();
        if num_units == 0 {
            return Err(IubfError::config("units", "need at least one spatial unit"));
        }
        if observations.ncols() != times.len() {
            return Err(IubfError::dimension(
                "observation columns",
                times.len(),
                observations.ncols(),
            ));
        }
        let mut prev = t0;
        for &t in &times {
            if !(t > prev) {
                return Err(IubfError::config(
                    "times",
                    format!("observation times must increase from t0 = {t0}"),
                ));
            }
            prev = t;
        }
        Ok(Self {
            num_units,
            t0,
            times,
            observations,
            param_names: BM_PARAM_NAMES.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Simulate `num_times` unit-spaced observations at `params` and wrap
    /// them in a model starting at `t0 = 0`.
    pub fn simulated<R: Rng + ?Sized>(
        num_units: usize,
        num_times: usize,
        params: &DVector<f64>,
        rng: &mut R,
    ) -> IubfResult<Self> {
        let times: Vec<f64> = (1..=num_times).map(|t| t as f64).collect();
        let placeholder = DMatrix::from_element(num_units, num_times, f64::NAN);
        let mut model = Self::new(0.0, times, placeholder)?;
        let (_, observations) = model.simulate(params, rng).map_err(|source| {
            IubfError::ModelEvaluation {
                time: 0,
                param: 0,
                source,
            }
        })?;
        model.observations = observations;
        Ok(model)
    }

    /// Observations, `units × times`.
    pub fn observations(&self) -> &DMatrix<f64> {
        &self.observations
    }

    /// Transform matching the parameter order.
    pub fn transform(&self) -> CoordinateTransform {
        CoordinateTransform::new(vec![Scale::Logit, Scale::Log, Scale::Log, Scale::Identity])
    }

    /// Distance between two units around the circle.
    #[inline]
    pub fn ring_distance(&self, u: usize, v: usize) -> usize {
        let d = u.abs_diff(v);
        d.min(self.num_units - d)
    }

    /// Lower Cholesky factor of the increment correlation matrix.
    pub fn correlation_factor(&self, rho: f64) -> Result<DMatrix<f64>, ModelError> {
        if !(0.0..1.0).contains(&rho) {
            return Err(ModelError::Process(format!("rho must lie in [0, 1), got {rho}")));
        }
        let corr = DMatrix::from_fn(self.num_units, self.num_units, |u, v| {
            rho.powi(self.ring_distance(u, v) as i32)
        });
        corr.cholesky()
            .map(|chol| chol.l())
            .ok_or_else(|| {
                ModelError::Process(format!("correlation at rho = {rho} is not positive definite"))
            })
    }

    /// Simulate latent states and observations at every observation time.
    ///
    /// Returns `(states, observations)`, both `units × times`.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        params: &DVector<f64>,
        rng: &mut R,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>), ModelError> {
        let params = DMatrix::from_column_slice(params.len(), 1, params.as_slice());
        check_params(&params)?;
        let tau = params[(TAU, 0)];
        let noise = Normal::new(0.0, tau).map_err(|e| ModelError::Measurement(e.to_string()))?;

        let num_times = self.times.len();
        let mut states = DMatrix::zeros(self.num_units, num_times);
        let mut observations = DMatrix::zeros(self.num_units, num_times);

        let mut x = self.sample_initial_state(&params, rng)?;
        let mut from = self.t0;
        for (t, &to) in self.times.iter().enumerate() {
            x = self.advance_state(&x, &params, from, to, rng)?;
            from = to;
            for u in 0..self.num_units {
                states[(u, t)] = x[(u, 0)];
                observations[(u, t)] = x[(u, 0)] + noise.sample(rng);
            }
        }
        Ok((states, observations))
    }
}

fn check_params(params: &DMatrix<f64>) -> Result<(), ModelError> {
    if params.nrows() != BM_PARAM_NAMES.len() {
        return Err(ModelError::Initialization(format!(
            "expected {} parameters, got {}",
            BM_PARAM_NAMES.len(),
            params.nrows()
        )));
    }
    for col in params.column_iter() {
        if !(col[SIGMA] > 0.0 && col[TAU] > 0.0) {
            return Err(ModelError::Process(format!(
                "sigma and tau must be positive, got sigma = {}, tau = {}",
                col[SIGMA], col[TAU]
            )));
        }
    }
    Ok(())
}

impl SpatialModel for BrownianMotionModel {
    fn num_units(&self) -> usize {
        self.num_units
    }

    fn state_dim(&self) -> usize {
        self.num_units
    }

    fn param_names(&self) -> &[String] {
        &self.param_names
    }

    fn t0(&self) -> f64 {
        self.t0
    }

    fn times(&self) -> &[f64] {
        &self.times
    }

    fn sample_initial_state<R: Rng + ?Sized>(
        &self,
        params: &DMatrix<f64>,
        _rng: &mut R,
    ) -> Result<DMatrix<f64>, ModelError> {
        if params.nrows() != BM_PARAM_NAMES.len() {
            return Err(ModelError::Initialization(format!(
                "expected {} parameters, got {}",
                BM_PARAM_NAMES.len(),
                params.nrows()
            )));
        }
        Ok(DMatrix::from_fn(self.num_units, params.ncols(), |_, j| params[(X0, j)]))
    }

    fn advance_state<R: Rng + ?Sized>(
        &self,
        states: &DMatrix<f64>,
        params: &DMatrix<f64>,
        from_time: f64,
        to_time: f64,
        rng: &mut R,
    ) -> Result<DMatrix<f64>, ModelError> {
        check_params(params)?;
        let dt = to_time - from_time;
        if dt < 0.0 {
            return Err(ModelError::Process(format!(
                "cannot advance backwards from {from_time} to {to_time}"
            )));
        }

        let mut next = states.clone();
        // Replicates of one group share rho; refactor only when it changes
        let mut factor_rho = f64::NAN;
        let mut factor = DMatrix::zeros(0, 0);
        for j in 0..states.ncols() {
            let rho = params[(RHO, j)].clamp(0.0, MAX_RHO);
            if rho != factor_rho {
                factor = self.correlation_factor(rho)?;
                factor_rho = rho;
            }
            let scale = params[(SIGMA, j)] * dt.sqrt();
            let z: DVector<f64> =
                DVector::from_fn(self.num_units, |_, _| StandardNormal.sample(&mut *rng));
            let increment = &factor * z;
            for u in 0..self.num_units {
                next[(u, j)] += scale * increment[u];
            }
        }
        Ok(next)
    }

    fn conditional_log_density(
        &self,
        states: &DMatrix<f64>,
        params: &DMatrix<f64>,
        time_index: usize,
    ) -> Result<DMatrix<f64>, ModelError> {
        if time_index >= self.times.len() {
            return Err(ModelError::Measurement(format!(
                "time index {time_index} out of range for {} observation times",
                self.times.len()
            )));
        }
        let half_log_2pi = 0.5 * (2.0 * PI).ln();
        Ok(DMatrix::from_fn(self.num_units, states.ncols(), |u, j| {
            let y = self.observations[(u, time_index)];
            if y.is_nan() {
                return 0.0;
            }
            let tau = params[(TAU, j)];
            let z = (y - states[(u, j)]) / tau;
            -half_log_2pi - tau.ln() - 0.5 * z * z
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::rng::SimpleRng;
    use crate::filter::traits::ParameterTransform;

    fn params(rho: f64, sigma: f64, tau: f64, x0: f64) -> DVector<f64> {
        DVector::from_vec(vec![rho, sigma, tau, x0])
    }

    #[test]
    fn test_ring_distance_wraps() {
        let m = BrownianMotionModel::new(0.0, vec![1.0], DMatrix::zeros(6, 1)).unwrap();
        assert_eq!(m.ring_distance(0, 1), 1);
        assert_eq!(m.ring_distance(0, 5), 1);
        assert_eq!(m.ring_distance(1, 4), 3);
        assert_eq!(m.ring_distance(2, 2), 0);
    }

    #[test]
    fn test_correlation_factor_reproduces_matrix() {
        let m = BrownianMotionModel::new(0.0, vec![1.0], DMatrix::zeros(5, 1)).unwrap();
        let l = m.correlation_factor(0.4).unwrap();
        let c = &l * l.transpose();
        for u in 0..5 {
            for v in 0..5 {
                let expected = 0.4f64.powi(m.ring_distance(u, v) as i32);
                assert!((c[(u, v)] - expected).abs() < 1e-10);
            }
        }
        assert!(m.correlation_factor(1.0).is_err());
    }

    #[test]
    fn test_missing_observation_contributes_zero() {
        let obs = DMatrix::from_row_slice(2, 1, &[f64::NAN, 0.0]);
        let m = BrownianMotionModel::new(0.0, vec![1.0], obs).unwrap();
        let p = DMatrix::from_column_slice(4, 1, &[0.5, 1.0, 1.0, 0.0]);
        let states = DMatrix::zeros(2, 1);
        let ld = m.conditional_log_density(&states, &p, 0).unwrap();
        assert_eq!(ld[(0, 0)], 0.0);
        assert!((ld[(1, 0)] + 0.5 * (2.0 * PI).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_interval_keeps_state() {
        let m = BrownianMotionModel::new(0.0, vec![1.0], DMatrix::zeros(3, 1)).unwrap();
        let p = DMatrix::from_fn(4, 2, |i, _| [0.3, 1.0, 1.0, 2.0][i]);
        let mut rng = SimpleRng::new(3);
        let x = m.sample_initial_state(&p, &mut rng).unwrap();
        assert!(x.iter().all(|&v| v == 2.0));
        let y = m.advance_state(&x, &p, 1.0, 1.0, &mut rng).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn test_invalid_params_are_model_errors() {
        let m = BrownianMotionModel::new(0.0, vec![1.0], DMatrix::zeros(2, 1)).unwrap();
        let mut rng = SimpleRng::new(1);
        let bad = DMatrix::from_column_slice(4, 1, &[0.5, -1.0, 1.0, 0.0]);
        let x = DMatrix::zeros(2, 1);
        assert!(matches!(
            m.advance_state(&x, &bad, 0.0, 1.0, &mut rng),
            Err(ModelError::Process(_))
        ));
    }

    #[test]
    fn test_rho_rounded_to_one_is_clamped() {
        let m = BrownianMotionModel::new(0.0, vec![1.0], DMatrix::zeros(5, 1)).unwrap();
        // logit-scale value large enough to map back to exactly 1
        let estimation = DVector::from_vec(vec![40.0, 0.0, 0.0, 0.0]);
        let rho = m.transform().to_natural_scale(&estimation)[0];
        assert_eq!(rho, 1.0);
        assert!(m.correlation_factor(rho).is_err());

        let p = DMatrix::from_column_slice(4, 2, &[rho, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
        let x = DMatrix::zeros(5, 2);
        let mut rng = SimpleRng::new(4);
        let y = m.advance_state(&x, &p, 0.0, 1.0, &mut rng).unwrap();
        assert!(y.iter().all(|v| v.is_finite()));
        // near-perfect correlation moves every unit together
        for j in 0..2 {
            for u in 1..5 {
                assert!((y[(u, j)] - y[(0, j)]).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_simulated_model_shapes() {
        let mut rng = SimpleRng::new(11);
        let m =
            BrownianMotionModel::simulated(4, 6, &params(0.5, 1.0, 0.5, 1.0), &mut rng).unwrap();
        assert_eq!(m.num_units(), 4);
        assert_eq!(m.num_times(), 6);
        assert_eq!(m.observations().shape(), (4, 6));
        assert!(m.observations().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_times_must_increase() {
        assert!(BrownianMotionModel::new(0.0, vec![1.0, 1.0], DMatrix::zeros(1, 2)).is_err());
        assert!(BrownianMotionModel::new(1.0, vec![1.0], DMatrix::zeros(1, 1)).is_err());
    }
}
