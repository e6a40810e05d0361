//! Iterated unadapted bagged filter.
//!
//! [`Iubf`] repeats the single-pass [`UnadaptedBaggedFilter`] sweep
//! `iterations` times. The first sweep starts from a swarm whose groups all
//! equal the starting point; every later sweep starts from the previous
//! sweep's final swarm. After each sweep the estimate is the swarm mean on
//! the estimation scale, mapped back to the natural scale.
//!
//! # Example
//!
//! ```no_run
//! use iubf::filter::{Iubf, IubfConfig, LaggedNeighborhood, RwSdSchedule};
//! use iubf::models::BrownianMotionModel;
//! use iubf::common::rng::SimpleRng;
//! use nalgebra::DVector;
//!
//! let truth = DVector::from_vec(vec![0.4, 1.0, 1.0, 0.0]);
//! let mut rng = SimpleRng::new(7);
//! let model = BrownianMotionModel::simulated(5, 20, &truth, &mut rng).unwrap();
//! let transform = model.transform();
//!
//! let config = IubfConfig::new(5, 20, 10)
//!     .with_rw_sd(RwSdSchedule::new().constant("rho", 0.02).constant("sigma", 0.02));
//! let iubf = Iubf::new(model, transform, LaggedNeighborhood::default(), config).unwrap();
//! let output = iubf.run(&truth).unwrap();
//! assert_eq!(output.trace.len(), 6);
//! ```

use nalgebra::DVector;

use super::bagged::UnadaptedBaggedFilter;
use super::config::IubfConfig;
use super::errors::{IubfError, IubfResult};
use super::neighborhood::Neighborhood;
use super::output::{IubfOutput, Trace};
use super::population::ParameterSwarm;
use super::scheduler::{DefaultScheduler, TaskScheduler};
use super::traits::{ParameterTransform, SpatialModel};
use crate::common::rng::SimpleRng;
use crate::reporter::{NoOpReporter, SweepReporter};

/// Iterated unadapted bagged filter.
///
/// Owns the model, the parameter transform, the neighborhood and the
/// scheduler. The configuration is validated against the model when the
/// driver is built, so [`run`](Self::run) only fails on bad starting
/// values or model errors.
pub struct Iubf<M, T, N, S = DefaultScheduler>
where
    M: SpatialModel,
    T: ParameterTransform,
    N: Neighborhood,
    S: TaskScheduler,
{
    model: M,
    transform: T,
    neighborhood: N,
    scheduler: S,
    config: IubfConfig,
}

impl<M, T, N> Iubf<M, T, N, DefaultScheduler>
where
    M: SpatialModel,
    T: ParameterTransform,
    N: Neighborhood,
{
    /// Create a driver on the default scheduler.
    pub fn new(model: M, transform: T, neighborhood: N, config: IubfConfig) -> IubfResult<Self> {
        Self::with_scheduler(model, transform, neighborhood, DefaultScheduler::default(), config)
    }
}

impl<M, T, N, S> Iubf<M, T, N, S>
where
    M: SpatialModel,
    T: ParameterTransform,
    N: Neighborhood,
    S: TaskScheduler,
{
    /// Create a driver with an explicit scheduler.
    pub fn with_scheduler(
        model: M,
        transform: T,
        neighborhood: N,
        scheduler: S,
        config: IubfConfig,
    ) -> IubfResult<Self> {
        let iubf = Self {
            model,
            transform,
            neighborhood,
            scheduler,
            config,
        };
        // Builds and drops a filter to surface config errors now
        iubf.filter()?;
        Ok(iubf)
    }

    /// The configuration.
    pub fn config(&self) -> &IubfConfig {
        &self.config
    }

    /// The model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The parameter transform.
    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Single-pass filter over this driver's collaborators.
    pub fn filter(&self) -> IubfResult<UnadaptedBaggedFilter<'_, M, T, N, S>> {
        UnadaptedBaggedFilter::new(
            &self.model,
            &self.transform,
            &self.neighborhood,
            &self.scheduler,
            &self.config,
        )
    }

    /// Run `config.iterations` sweeps from a natural-scale starting point.
    pub fn run(&self, start: &DVector<f64>) -> IubfResult<IubfOutput> {
        self.run_with_reporter(start, &mut NoOpReporter)
    }

    /// [`run`](Self::run) with a reporter receiving progress events.
    pub fn run_with_reporter<R: SweepReporter + ?Sized>(
        &self,
        start: &DVector<f64>,
        reporter: &mut R,
    ) -> IubfResult<IubfOutput> {
        if start.len() != self.model.num_params() {
            return Err(IubfError::dimension(
                "starting parameters",
                self.model.num_params(),
                start.len(),
            ));
        }
        if start.iter().any(|v| !v.is_finite()) {
            return Err(IubfError::config("start", "starting parameters must be finite"));
        }

        let start_est = self.transform.to_estimation_scale(start);
        let swarm = ParameterSwarm::replicate(
            &start_est,
            self.config.num_params,
            self.config.reps_per_param,
        );
        let trace = Trace::starting_at(self.model.param_names().to_vec(), start);
        let mut rng = SimpleRng::new(self.config.seed);

        log::debug!(
            "IUBF start: {} iterations, {} groups x {} replicates, {} units, {} times",
            self.config.iterations,
            self.config.num_params,
            self.config.reps_per_param,
            self.model.num_units(),
            self.model.num_times()
        );
        self.iterate(
            start.clone(),
            swarm,
            trace,
            0,
            self.config.iterations,
            &mut rng,
            reporter,
        )
    }

    /// Continue a previous run for `extra` more sweeps.
    ///
    /// The new sweeps start from `previous.swarm`, the cooling iteration
    /// counter continues from `previous.iterations_done` and the trace is
    /// extended rather than restarted.
    pub fn resume(&self, previous: &IubfOutput, extra: usize) -> IubfResult<IubfOutput> {
        self.resume_with_reporter(previous, extra, &mut NoOpReporter)
    }

    /// [`resume`](Self::resume) with a reporter.
    pub fn resume_with_reporter<R: SweepReporter + ?Sized>(
        &self,
        previous: &IubfOutput,
        extra: usize,
        reporter: &mut R,
    ) -> IubfResult<IubfOutput> {
        if extra == 0 {
            return Err(IubfError::config("Nubf", "must resume for at least one iteration"));
        }
        if previous.param_names != self.model.param_names() {
            return Err(IubfError::config(
                "start",
                "previous output was produced for different parameters",
            ));
        }
        let done = previous.iterations_done;
        let mut rng = SimpleRng::for_task(self.config.seed, done);
        self.iterate(
            previous.start.clone(),
            previous.swarm.clone(),
            previous.trace.clone(),
            done,
            extra,
            &mut rng,
            reporter,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn iterate<R: SweepReporter + ?Sized>(
        &self,
        start: DVector<f64>,
        mut swarm: ParameterSwarm,
        mut trace: Trace,
        done: usize,
        count: usize,
        rng: &mut SimpleRng,
        reporter: &mut R,
    ) -> IubfResult<IubfOutput> {
        let filter = self.filter()?;
        let mut estimate = self.transform.to_natural_scale(&swarm.mean());
        let mut log_likelihood = f64::NAN;
        let mut step_log_likelihoods = Vec::new();

        for m in done + 1..=done + count {
            let outcome = filter.sweep(swarm, m, rng, reporter)?;
            log_likelihood = outcome.log_likelihood();
            estimate = self.transform.to_natural_scale(&outcome.swarm.mean());
            trace.push(m, log_likelihood, &estimate);
            reporter.on_sweep_complete(m, log_likelihood, &estimate);
            step_log_likelihoods = outcome.step_log_likelihoods;
            swarm = outcome.swarm;
        }

        let mut config = self.config.clone();
        config.iterations = done + count;
        Ok(IubfOutput {
            start,
            param_names: self.model.param_names().to_vec(),
            config,
            trace,
            swarm,
            estimate,
            log_likelihood,
            step_log_likelihoods,
            iterations_done: done + count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::neighborhood::EmptyNeighborhood;
    use crate::filter::scheduler::SequentialScheduler;
    use crate::filter::transform::CoordinateTransform;
    use crate::models::BrownianMotionModel;
    use crate::reporter::DebugReporter;

    type TestIubf =
        Iubf<BrownianMotionModel, CoordinateTransform, EmptyNeighborhood, SequentialScheduler>;

    fn driver(iterations: usize) -> TestIubf {
        let mut rng = SimpleRng::new(5);
        let truth = DVector::from_vec(vec![0.3, 1.0, 0.5, 0.0]);
        let model = BrownianMotionModel::simulated(2, 3, &truth, &mut rng).unwrap();
        let transform = model.transform();
        let config = IubfConfig::new(iterations, 3, 2);
        Iubf::with_scheduler(model, transform, EmptyNeighborhood, SequentialScheduler, config)
            .unwrap()
    }

    #[test]
    fn test_non_finite_start_rejected() {
        let iubf = driver(1);
        let start = DVector::from_vec(vec![0.3, f64::NAN, 0.5, 0.0]);
        assert!(matches!(
            iubf.run(&start),
            Err(IubfError::Configuration { setting: "start", .. })
        ));
    }

    #[test]
    fn test_reporter_sees_every_sweep() {
        let iubf = driver(3);
        let mut reporter = DebugReporter::new();
        let output = iubf
            .run_with_reporter(&DVector::from_vec(vec![0.3, 1.0, 0.5, 0.0]), &mut reporter)
            .unwrap();
        let iterations: Vec<usize> = reporter.sweep_events().iter().map(|e| e.iteration).collect();
        assert_eq!(iterations, vec![1, 2, 3]);
        assert_eq!(reporter.step_events().len(), 9);
        assert_eq!(reporter.sweep_events()[2].log_likelihood, output.log_likelihood);
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let mut rng = SimpleRng::new(5);
        let truth = DVector::from_vec(vec![0.3, 1.0, 0.5, 0.0]);
        let model = BrownianMotionModel::simulated(2, 3, &truth, &mut rng).unwrap();
        let transform = model.transform();
        let config = IubfConfig::new(1, 3, 2).with_prop(0.0);
        assert!(matches!(
            Iubf::new(model, transform, EmptyNeighborhood, config),
            Err(IubfError::Configuration { setting: "prop", .. })
        ));
    }
}
