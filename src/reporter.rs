//! Observability for bagged filter runs.
//!
//! The [`SweepReporter`] trait receives callbacks at the start of each
//! sweep, after each observation time and at the end of each sweep. The
//! filter itself never logs; reporters decide what to do with the events.
//!
//! # Reporters
//!
//! - [`NoOpReporter`]: does nothing (the default)
//! - [`LoggingReporter`]: emits events through the `log` facade
//! - [`DebugReporter`]: stores every event for post-hoc inspection
//! - [`CompositeReporter`]: forwards events to two reporters
//!
//! # Example
//!
//! ```
//! use iubf::reporter::{DebugReporter, SweepReporter};
//! use nalgebra::DVector;
//!
//! let mut reporter = DebugReporter::new();
//! reporter.on_sweep_complete(1, -12.5, &DVector::from_vec(vec![0.3]));
//! assert_eq!(reporter.sweep_events().len(), 1);
//! ```

use nalgebra::DVector;

use crate::filter::bagged::StepDiagnostics;
use crate::filter::population::ParameterSwarm;

// ============================================================================
// SweepReporter Trait
// ============================================================================

/// Observability trait for filter execution.
///
/// All methods have default empty implementations, so you only need
/// to override the events you care about. Iterations are 1-based.
///
/// # Thread Safety
///
/// Callbacks are made from the driving thread between parallel phases,
/// so reporters are NOT required to be `Send + Sync`.
pub trait SweepReporter {
    /// Called before the first observation time of a sweep.
    fn on_sweep_start(&mut self, _iteration: usize, _swarm: &ParameterSwarm) {}

    /// Called after one observation time has been filtered and resampled.
    fn on_time_step(&mut self, _iteration: usize, _step: &StepDiagnostics) {}

    /// Called after a sweep with its total log-likelihood and the new
    /// natural-scale point estimate.
    fn on_sweep_complete(
        &mut self,
        _iteration: usize,
        _log_likelihood: f64,
        _estimate: &DVector<f64>,
    ) {
    }
}

// ============================================================================
// NoOpReporter
// ============================================================================

/// Zero-cost reporter that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReporter;

impl NoOpReporter {
    /// Create a new no-op reporter.
    pub fn new() -> Self {
        Self
    }
}

impl SweepReporter for NoOpReporter {}

// ============================================================================
// DebugReporter
// ============================================================================

/// Completed sweep as captured by [`DebugReporter`].
#[derive(Debug, Clone, PartialEq)]
pub struct SweepEvent {
    /// Outer iteration (1-based)
    pub iteration: usize,
    /// Total log-likelihood of the sweep
    pub log_likelihood: f64,
    /// Natural-scale point estimate after the sweep
    pub estimate: DVector<f64>,
}

/// Reporter that captures all events for debugging.
///
/// Stores a clone of every swarm passed to `on_sweep_start`; keep runs
/// short when using it.
#[derive(Debug, Clone, Default)]
pub struct DebugReporter {
    /// Swarm at the start of each sweep
    starts: Vec<(usize, ParameterSwarm)>,
    /// Per-time diagnostics
    steps: Vec<(usize, StepDiagnostics)>,
    /// Completed sweeps
    sweeps: Vec<SweepEvent>,
}

impl DebugReporter {
    /// Create a new debug reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all captured events.
    pub fn clear(&mut self) {
        self.starts.clear();
        self.steps.clear();
        self.sweeps.clear();
    }

    /// Swarms at sweep start.
    pub fn start_events(&self) -> &[(usize, ParameterSwarm)] {
        &self.starts
    }

    /// Per-time diagnostics, tagged with the iteration.
    pub fn step_events(&self) -> &[(usize, StepDiagnostics)] {
        &self.steps
    }

    /// Completed sweeps.
    pub fn sweep_events(&self) -> &[SweepEvent] {
        &self.sweeps
    }

    /// Total number of captured events across all types.
    pub fn total_events(&self) -> usize {
        self.starts.len() + self.steps.len() + self.sweeps.len()
    }
}

impl SweepReporter for DebugReporter {
    fn on_sweep_start(&mut self, iteration: usize, swarm: &ParameterSwarm) {
        self.starts.push((iteration, swarm.clone()));
    }

    fn on_time_step(&mut self, iteration: usize, step: &StepDiagnostics) {
        self.steps.push((iteration, step.clone()));
    }

    fn on_sweep_complete(
        &mut self,
        iteration: usize,
        log_likelihood: f64,
        estimate: &DVector<f64>,
    ) {
        self.sweeps.push(SweepEvent {
            iteration,
            log_likelihood,
            estimate: estimate.clone(),
        });
    }
}

// ============================================================================
// LoggingReporter
// ============================================================================

/// Reporter that logs events using the log crate.
///
/// - `on_sweep_complete`: INFO
/// - `on_sweep_start`, `on_time_step`: DEBUG
/// - elite/threshold details (verbose only): TRACE
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter {
    /// Whether to include per-step resampling details
    verbose: bool,
}

impl LoggingReporter {
    /// Create a new logging reporter.
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Create a verbose logging reporter that includes resampling details.
    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

impl SweepReporter for LoggingReporter {
    fn on_sweep_start(&mut self, iteration: usize, swarm: &ParameterSwarm) {
        log::debug!(
            "Sweep {} start: {} parameter groups x {} replicates",
            iteration,
            swarm.num_groups(),
            swarm.reps_per_param()
        );
    }

    fn on_time_step(&mut self, iteration: usize, step: &StepDiagnostics) {
        log::debug!(
            "Sweep {} time {}: loglik increment {:.4}, elite {}",
            iteration,
            step.time,
            step.log_likelihood,
            step.elite_size
        );
        if self.verbose {
            log::trace!(
                "  alpha={:.4e}, threshold={:.4}, history depth={}, floored={}",
                step.alpha,
                step.threshold,
                step.history_depth,
                step.floored
            );
        }
    }

    fn on_sweep_complete(
        &mut self,
        iteration: usize,
        log_likelihood: f64,
        estimate: &DVector<f64>,
    ) {
        log::info!(
            "Iteration {} complete: loglik {:.4}, estimate {:?}",
            iteration,
            log_likelihood,
            estimate.as_slice()
        );
    }
}

// ============================================================================
// CompositeReporter
// ============================================================================

/// Reporter that forwards events to two child reporters.
#[derive(Debug, Clone)]
pub struct CompositeReporter<A: SweepReporter, B: SweepReporter> {
    first: A,
    second: B,
}

impl<A: SweepReporter, B: SweepReporter> CompositeReporter<A, B> {
    /// Create a new composite reporter.
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    /// Get a reference to the first reporter.
    pub fn first(&self) -> &A {
        &self.first
    }

    /// Get a reference to the second reporter.
    pub fn second(&self) -> &B {
        &self.second
    }

    /// Consume and return both reporters.
    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: SweepReporter, B: SweepReporter> SweepReporter for CompositeReporter<A, B> {
    fn on_sweep_start(&mut self, iteration: usize, swarm: &ParameterSwarm) {
        self.first.on_sweep_start(iteration, swarm);
        self.second.on_sweep_start(iteration, swarm);
    }

    fn on_time_step(&mut self, iteration: usize, step: &StepDiagnostics) {
        self.first.on_time_step(iteration, step);
        self.second.on_time_step(iteration, step);
    }

    fn on_sweep_complete(
        &mut self,
        iteration: usize,
        log_likelihood: f64,
        estimate: &DVector<f64>,
    ) {
        self.first.on_sweep_complete(iteration, log_likelihood, estimate);
        self.second.on_sweep_complete(iteration, log_likelihood, estimate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(time: usize) -> StepDiagnostics {
        StepDiagnostics {
            time,
            alpha: 1.0,
            log_likelihood: -1.0,
            elite_size: 2,
            threshold: -1.5,
            history_depth: 1,
            floored: 0,
        }
    }

    #[test]
    fn test_debug_reporter_captures() {
        let mut r = DebugReporter::new();
        r.on_sweep_start(1, &ParameterSwarm::replicate(&DVector::zeros(2), 3, 2));
        r.on_time_step(1, &step(0));
        r.on_time_step(1, &step(1));
        r.on_sweep_complete(1, -2.0, &DVector::zeros(2));
        assert_eq!(r.total_events(), 4);
        assert_eq!(r.step_events()[1].1.time, 1);
        r.clear();
        assert_eq!(r.total_events(), 0);
    }

    #[test]
    fn test_composite_forwards_to_both() {
        let mut c = CompositeReporter::new(DebugReporter::new(), DebugReporter::new());
        c.on_time_step(2, &step(4));
        assert_eq!(c.first().step_events().len(), 1);
        assert_eq!(c.second().step_events().len(), 1);
    }

    #[test]
    fn test_logging_reporter_does_not_panic() {
        let mut r = LoggingReporter::verbose();
        r.on_time_step(1, &step(0));
        r.on_sweep_complete(1, -3.0, &DVector::from_vec(vec![1.0]));
    }
}
