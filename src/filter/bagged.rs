//! Unadapted bagged filter sweep.
//!
//! One sweep runs every observation time once. At each time the swarm is
//! perturbed, every parameter group advances its own block of replicates
//! and evaluates per-unit densities (one task per group, see
//! [`TaskScheduler`]), the neighborhood combiner turns each block into a
//! group weight, and the elite resampler reorders groups, replicates and
//! history together.
//!
//! State carried from one time to the next: the swarm, the reordered
//! ensemble and the history buffer. Nothing else.

use std::ops::Range;

use nalgebra::DMatrix;
use rand::RngCore;

use super::combiner::{step_log_likelihood, LocalNeighborhoods};
use super::config::IubfConfig;
use super::errors::{IubfError, IubfResult, ModelError};
use super::history::{required_depth, HistoryBuffer};
use super::neighborhood::Neighborhood;
use super::perturbation::perturb_parameters;
use super::population::{
    block_range, expand_to_replicates, is_block_order, replicate_columns, ParameterSwarm,
};
use super::resampler::elite_resample;
use super::scheduler::TaskScheduler;
use super::traits::{ParameterTransform, SpatialModel};
use crate::common::rng::SimpleRng;
use crate::common::utils::{floor_log_densities, reindex_columns};
use crate::reporter::SweepReporter;

/// What happened at one observation time.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDiagnostics {
    /// Observation time index (0-based)
    pub time: usize,
    /// Cooling multiplier applied to the random walk
    pub alpha: f64,
    /// Log-likelihood increment of this time
    pub log_likelihood: f64,
    /// Number of elite groups
    pub elite_size: usize,
    /// Quantile threshold of the elite selection
    pub threshold: f64,
    /// History depth carried into the next time
    pub history_depth: usize,
    /// Conditional densities replaced by the floor
    pub floored: usize,
}

/// Result of one sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Perturbed and resampled swarm after the last time
    pub swarm: ParameterSwarm,
    /// Log-likelihood increment per observation time
    pub step_log_likelihoods: Vec<f64>,
    /// Per-time diagnostics
    pub diagnostics: Vec<StepDiagnostics>,
}

impl SweepOutcome {
    /// Total log-likelihood estimate of the sweep.
    pub fn log_likelihood(&self) -> f64 {
        self.step_log_likelihoods.iter().sum()
    }
}

/// Result of one group task.
struct GroupResult {
    states: DMatrix<f64>,
    log_cd: DMatrix<f64>,
    weight: f64,
    floored: usize,
}

/// Mutable state of a sweep between observation times.
#[derive(Debug, Clone)]
pub struct SweepState {
    /// Current swarm (estimation scale)
    pub swarm: ParameterSwarm,
    /// Ensemble aligned with the swarm, `None` before the first time
    pub ensemble: Option<DMatrix<f64>>,
    /// Past conditional log-densities aligned with the ensemble
    pub history: HistoryBuffer,
}

impl SweepState {
    /// Fresh state for a sweep starting from `swarm`.
    pub fn new(swarm: ParameterSwarm) -> Self {
        Self {
            swarm,
            ensemble: None,
            history: HistoryBuffer::new(),
        }
    }
}

/// Unadapted bagged filter over one model, transform and neighborhood.
///
/// Borrowed collaborators only; the random-walk sd schedule is resolved
/// against the model once at construction.
pub struct UnadaptedBaggedFilter<'a, M, T, N, S>
where
    M: SpatialModel,
    T: ParameterTransform + ?Sized,
    N: Neighborhood + ?Sized,
    S: TaskScheduler,
{
    model: &'a M,
    transform: &'a T,
    neighborhood: &'a N,
    scheduler: &'a S,
    config: &'a IubfConfig,
    rw_sd: DMatrix<f64>,
}

impl<'a, M, T, N, S> UnadaptedBaggedFilter<'a, M, T, N, S>
where
    M: SpatialModel,
    T: ParameterTransform + ?Sized,
    N: Neighborhood + ?Sized,
    S: TaskScheduler,
{
    /// Validate the configuration against the model and build the filter.
    pub fn new(
        model: &'a M,
        transform: &'a T,
        neighborhood: &'a N,
        scheduler: &'a S,
        config: &'a IubfConfig,
    ) -> IubfResult<Self> {
        config.validate()?;
        if model.num_times() == 0 {
            return Err(IubfError::config("times", "model has no observation times"));
        }
        if model.num_units() == 0 {
            return Err(IubfError::config("units", "model has no spatial units"));
        }
        let rw_sd = config.rw_sd.resolve(model.param_names(), model.num_times())?;
        Ok(Self {
            model,
            transform,
            neighborhood,
            scheduler,
            config,
            rw_sd,
        })
    }

    /// Resolved `params × times` random-walk sd matrix.
    pub fn rw_sd(&self) -> &DMatrix<f64> {
        &self.rw_sd
    }

    /// Run every observation time once, starting from `swarm`.
    ///
    /// `iteration` is the 1-based outer iteration used by the cooling
    /// schedule.
    pub fn sweep<Rep: SweepReporter + ?Sized>(
        &self,
        swarm: ParameterSwarm,
        iteration: usize,
        rng: &mut SimpleRng,
        reporter: &mut Rep,
    ) -> IubfResult<SweepOutcome> {
        self.check_swarm(&swarm)?;
        reporter.on_sweep_start(iteration, &swarm);

        let num_times = self.model.num_times();
        let mut state = SweepState::new(swarm);
        let mut step_log_likelihoods = Vec::with_capacity(num_times);
        let mut diagnostics = Vec::with_capacity(num_times);

        for t in 0..num_times {
            let (next, diag) = self.step(state, t, iteration, rng)?;
            state = next;
            reporter.on_time_step(iteration, &diag);
            step_log_likelihoods.push(diag.log_likelihood);
            diagnostics.push(diag);
        }

        Ok(SweepOutcome {
            swarm: state.swarm,
            step_log_likelihoods,
            diagnostics,
        })
    }

    /// Filter observation time `t` and resample.
    pub fn step(
        &self,
        mut state: SweepState,
        t: usize,
        iteration: usize,
        rng: &mut SimpleRng,
    ) -> IubfResult<(SweepState, StepDiagnostics)> {
        self.check_state(&state, t)?;
        let num_times = self.model.num_times();
        let num_units = self.model.num_units();
        let reps = state.swarm.reps_per_param();
        let num_groups = state.swarm.num_groups();

        // Perturb on the estimation scale, then hand natural values to the model
        let alpha = self.config.cooling.alpha(t + 1, iteration, num_times);
        let sd: Vec<f64> = self.rw_sd.column(t).iter().copied().collect();
        perturb_parameters(state.swarm.values_mut(), &sd, alpha, rng);
        let natural = state.swarm.to_natural(self.transform);

        let neighbors =
            LocalNeighborhoods::resolve(self.neighborhood, t, num_units, state.history.depth())?;
        let base_seed = rng.next_u64();

        let results = self.scheduler.map(num_groups, |k| {
            let mut task_rng = SimpleRng::for_task(base_seed, k);
            self.run_group(
                k,
                t,
                &natural,
                state.ensemble.as_ref(),
                &state.history,
                &neighbors,
                reps,
                &mut task_rng,
            )
        });
        let results: Vec<GroupResult> = results.into_iter().collect::<IubfResult<_>>()?;

        // Gather blocks in group order
        let total = num_groups * reps;
        let mut states = DMatrix::zeros(self.model.state_dim(), total);
        let mut log_cd = DMatrix::zeros(num_units, total);
        let mut weights = Vec::with_capacity(num_groups);
        let mut floored = 0;
        for (k, group) in results.into_iter().enumerate() {
            let start = k * reps;
            states.columns_mut(start, reps).copy_from(&group.states);
            log_cd.columns_mut(start, reps).copy_from(&group.log_cd);
            weights.push(group.weight);
            floored += group.floored;
        }

        let log_likelihood = step_log_likelihood(&weights);
        let selection = elite_resample(&weights, self.config.prop, rng);
        let replicate_order = expand_to_replicates(&selection.order, reps);
        debug_assert!(is_block_order(&replicate_order, reps));

        let depth = if t + 1 < num_times {
            required_depth(self.neighborhood, t + 1, num_units)
        } else {
            0
        };

        let next = SweepState {
            swarm: state.swarm.reorder(&selection.order),
            ensemble: Some(reindex_columns(&states, &replicate_order)),
            history: state.history.advance(log_cd, depth, &replicate_order),
        };

        let diag = StepDiagnostics {
            time: t,
            alpha,
            log_likelihood,
            elite_size: selection.elite_size(),
            threshold: selection.threshold,
            history_depth: next.history.depth(),
            floored,
        };
        Ok((next, diag))
    }

    /// Advance, evaluate and weight the replicate block of group `k`.
    #[allow(clippy::too_many_arguments)]
    fn run_group(
        &self,
        k: usize,
        t: usize,
        natural: &DMatrix<f64>,
        ensemble: Option<&DMatrix<f64>>,
        history: &HistoryBuffer,
        neighbors: &LocalNeighborhoods,
        reps: usize,
        rng: &mut SimpleRng,
    ) -> IubfResult<GroupResult> {
        let wrap = |source: ModelError| IubfError::ModelEvaluation {
            time: t,
            param: k,
            source,
        };
        let block: Range<usize> = block_range(k, reps);
        let params = replicate_columns(&natural.column(k).into_owned(), reps);

        let (from_time, initial) = match ensemble {
            Some(ensemble) => (
                self.model.times()[t - 1],
                ensemble.columns(block.start, reps).into_owned(),
            ),
            None => (
                self.model.t0(),
                self.model.sample_initial_state(&params, rng).map_err(wrap)?,
            ),
        };
        self.check_shape("initial state", &initial, self.model.state_dim(), reps)?;

        let to_time = self.model.times()[t];
        let states = self
            .model
            .advance_state(&initial, &params, from_time, to_time, rng)
            .map_err(wrap)?;
        self.check_shape("advanced state", &states, self.model.state_dim(), reps)?;

        let mut log_cd = self
            .model
            .conditional_log_density(&states, &params, t)
            .map_err(wrap)?;
        self.check_shape("conditional log-density", &log_cd, self.model.num_units(), reps)?;
        let floored = floor_log_densities(&mut log_cd, self.config.log_tol());

        let weight = neighbors.group_log_weight(&log_cd, history, &block);
        Ok(GroupResult {
            states,
            log_cd,
            weight,
            floored,
        })
    }

    fn check_shape(
        &self,
        what: &str,
        m: &DMatrix<f64>,
        rows: usize,
        cols: usize,
    ) -> IubfResult<()> {
        if m.nrows() != rows {
            return Err(IubfError::dimension(format!("{what} rows"), rows, m.nrows()));
        }
        if m.ncols() != cols {
            return Err(IubfError::dimension(format!("{what} columns"), cols, m.ncols()));
        }
        Ok(())
    }

    /// Inputs of [`step`](Self::step): time in range, ensemble present
    /// exactly after the first time, every matrix one column per replicate.
    fn check_state(&self, state: &SweepState, t: usize) -> IubfResult<()> {
        let num_times = self.model.num_times();
        if t >= num_times {
            return Err(IubfError::config(
                "time",
                format!("time index {t} out of range for {num_times} observation times"),
            ));
        }
        self.check_swarm(&state.swarm)?;
        if state.ensemble.is_some() != (t > 0) {
            return Err(IubfError::config(
                "time",
                format!("an ensemble is required at every time after the first, got t = {t}"),
            ));
        }
        let total = state.swarm.total_reps();
        if let Some(ensemble) = &state.ensemble {
            self.check_shape("ensemble", ensemble, self.model.state_dim(), total)?;
        }
        for lag in 1..=state.history.depth() {
            if let Some(past) = state.history.entry(lag) {
                self.check_shape("history", past, self.model.num_units(), total)?;
            }
        }
        Ok(())
    }

    fn check_swarm(&self, swarm: &ParameterSwarm) -> IubfResult<()> {
        if swarm.num_params() != self.model.num_params() {
            return Err(IubfError::dimension(
                "swarm parameters",
                self.model.num_params(),
                swarm.num_params(),
            ));
        }
        if swarm.num_groups() != self.config.num_params {
            return Err(IubfError::dimension(
                "swarm groups",
                self.config.num_params,
                swarm.num_groups(),
            ));
        }
        if swarm.reps_per_param() != self.config.reps_per_param {
            return Err(IubfError::dimension(
                "replicates per group",
                self.config.reps_per_param,
                swarm.reps_per_param(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::config::RwSdSchedule;
    use crate::filter::neighborhood::LaggedNeighborhood;
    use crate::filter::scheduler::SequentialScheduler;
    use crate::models::BrownianMotionModel;
    use crate::reporter::{DebugReporter, NoOpReporter};
    use nalgebra::DVector;

    fn model() -> BrownianMotionModel {
        let mut rng = SimpleRng::new(2);
        let truth = DVector::from_vec(vec![0.5, 1.0, 1.0, 0.0]);
        BrownianMotionModel::simulated(3, 4, &truth, &mut rng).unwrap()
    }

    #[test]
    fn test_rw_sd_resolved_per_time() {
        let model = model();
        let transform = model.transform();
        let config = IubfConfig::new(1, 3, 2)
            .with_rw_sd(RwSdSchedule::new().constant("sigma", 0.1).initial_value("x0", 0.5));
        let neighborhood = LaggedNeighborhood::default();
        let filter = UnadaptedBaggedFilter::new(
            &model,
            &transform,
            &neighborhood,
            &SequentialScheduler,
            &config,
        )
        .unwrap();
        let sd = filter.rw_sd();
        assert_eq!(sd.shape(), (4, 4));
        assert!(sd.row(1).iter().all(|&s| s == 0.1));
        assert_eq!(sd[(3, 0)], 0.5);
        assert!(sd.row(3).iter().skip(1).all(|&s| s == 0.0));
        assert!(sd.row(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_sweep_rejects_mismatched_swarm() {
        let model = model();
        let transform = model.transform();
        let config = IubfConfig::new(1, 3, 2);
        let neighborhood = LaggedNeighborhood::default();
        let filter = UnadaptedBaggedFilter::new(
            &model,
            &transform,
            &neighborhood,
            &SequentialScheduler,
            &config,
        )
        .unwrap();
        let swarm = ParameterSwarm::replicate(&DVector::zeros(4), 3, 5);
        let mut rng = SimpleRng::new(1);
        let err = filter.sweep(swarm, 1, &mut rng, &mut NoOpReporter).unwrap_err();
        assert!(matches!(err, IubfError::DimensionMismatch { expected: 2, actual: 5, .. }));
    }

    #[test]
    fn test_sweep_reports_every_time() {
        let model = model();
        let transform = model.transform();
        let config = IubfConfig::new(1, 4, 3)
            .with_rw_sd(RwSdSchedule::new().constant("rho", 0.1).constant("tau", 0.1));
        let neighborhood = LaggedNeighborhood::default();
        let filter = UnadaptedBaggedFilter::new(
            &model,
            &transform,
            &neighborhood,
            &SequentialScheduler,
            &config,
        )
        .unwrap();
        let start = transform.to_estimation_scale(&DVector::from_vec(vec![0.5, 1.0, 1.0, 0.0]));
        let swarm = ParameterSwarm::replicate(&start, 4, 3);
        let mut rng = SimpleRng::new(1);
        let mut reporter = DebugReporter::new();
        let outcome = filter.sweep(swarm, 1, &mut rng, &mut reporter).unwrap();

        assert_eq!(reporter.start_events().len(), 1);
        assert_eq!(reporter.step_events().len(), 4);
        assert_eq!(outcome.diagnostics.len(), 4);
        let times: Vec<usize> = outcome.diagnostics.iter().map(|d| d.time).collect();
        assert_eq!(times, vec![0, 1, 2, 3]);
        assert!(outcome.step_log_likelihoods.iter().all(|l| l.is_finite()));
        // alpha decays within a sweep
        assert!(outcome.diagnostics[3].alpha < outcome.diagnostics[0].alpha);
        // sigma and x0 carry no random walk
        for k in 0..4 {
            assert_eq!(outcome.swarm.values()[(1, k)], start[1]);
            assert_eq!(outcome.swarm.values()[(3, k)], start[3]);
        }
    }

    #[test]
    fn test_model_without_times_is_rejected() {
        let model = BrownianMotionModel::new(0.0, Vec::new(), DMatrix::zeros(2, 0)).unwrap();
        let transform = model.transform();
        let config = IubfConfig::new(1, 3, 2);
        let neighborhood = LaggedNeighborhood::default();
        let result = UnadaptedBaggedFilter::new(
            &model,
            &transform,
            &neighborhood,
            &SequentialScheduler,
            &config,
        );
        assert!(matches!(result, Err(IubfError::Configuration { setting: "times", .. })));
    }

    fn step_at(state: SweepState, t: usize) -> IubfResult<StepDiagnostics> {
        let model = model();
        let transform = model.transform();
        let config = IubfConfig::new(1, 3, 2);
        let neighborhood = LaggedNeighborhood::default();
        let filter = UnadaptedBaggedFilter::new(
            &model,
            &transform,
            &neighborhood,
            &SequentialScheduler,
            &config,
        )?;
        let mut rng = SimpleRng::new(1);
        filter.step(state, t, 1, &mut rng).map(|(_, diag)| diag)
    }

    fn swarm() -> ParameterSwarm {
        ParameterSwarm::replicate(&DVector::from_vec(vec![0.0, 0.0, 0.0, 0.0]), 3, 2)
    }

    fn state_at_later_time(ensemble_width: usize) -> SweepState {
        SweepState {
            swarm: swarm(),
            ensemble: Some(DMatrix::zeros(3, ensemble_width)),
            history: HistoryBuffer::new().advance(DMatrix::zeros(3, 6), 1, &[0, 1, 2, 3, 4, 5]),
        }
    }

    #[test]
    fn test_step_accepts_first_time() {
        let diag = step_at(SweepState::new(swarm()), 0).unwrap();
        assert_eq!(diag.time, 0);
        assert!(diag.log_likelihood.is_finite());
    }

    #[test]
    fn test_step_rejects_time_out_of_range() {
        assert!(matches!(
            step_at(SweepState::new(swarm()), 4),
            Err(IubfError::Configuration { setting: "time", .. })
        ));
    }

    #[test]
    fn test_step_requires_ensemble_after_first_time() {
        assert!(matches!(
            step_at(SweepState::new(swarm()), 1),
            Err(IubfError::Configuration { setting: "time", .. })
        ));
        assert!(matches!(
            step_at(state_at_later_time(6), 0),
            Err(IubfError::Configuration { setting: "time", .. })
        ));
        assert!(step_at(state_at_later_time(6), 1).is_ok());
    }

    #[test]
    fn test_step_rejects_ensemble_of_wrong_width() {
        assert!(matches!(
            step_at(state_at_later_time(5), 1),
            Err(IubfError::DimensionMismatch { expected: 6, actual: 5, .. })
        ));
    }

    #[test]
    fn test_step_rejects_history_of_wrong_width() {
        let mut state = state_at_later_time(6);
        state.history = HistoryBuffer::new().advance(DMatrix::zeros(3, 4), 1, &[0, 1, 2, 3]);
        assert!(matches!(
            step_at(state, 1),
            Err(IubfError::DimensionMismatch { expected: 6, actual: 4, .. })
        ));
    }

    #[test]
    fn test_step_rejects_mismatched_swarm() {
        let state = SweepState::new(ParameterSwarm::replicate(&DVector::zeros(4), 3, 5));
        assert!(matches!(
            step_at(state, 0),
            Err(IubfError::DimensionMismatch { expected: 2, actual: 5, .. })
        ));
    }
}
