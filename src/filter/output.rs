//! Output types for an iterated bagged filter run.
//!
//! - [`TraceRow`] - Log-likelihood and estimate after one iteration
//! - [`Trace`] - Every row of a run, starting with the starting point
//! - [`IubfOutput`] - Complete result: trace, final swarm and estimate

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::config::IubfConfig;
use super::population::ParameterSwarm;

/// One row of the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    /// Iterations completed when the row was recorded (0 for the start).
    pub iteration: usize,
    /// Sweep log-likelihood; `None` for the starting row.
    pub log_likelihood: Option<f64>,
    /// Natural-scale parameter estimate.
    pub params: Vec<f64>,
}

/// Per-iteration record of a run.
///
/// Row 0 holds the starting parameters and no log-likelihood; row `m`
/// holds the estimate after sweep `m` and that sweep's log-likelihood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Parameter names, in column order.
    pub param_names: Vec<String>,
    /// Rows, oldest first.
    pub rows: Vec<TraceRow>,
}

impl Trace {
    /// Trace containing only the starting row.
    pub fn starting_at(param_names: Vec<String>, start: &DVector<f64>) -> Self {
        Self {
            param_names,
            rows: vec![TraceRow {
                iteration: 0,
                log_likelihood: None,
                params: start.iter().copied().collect(),
            }],
        }
    }

    /// Append the result of one sweep.
    pub fn push(&mut self, iteration: usize, log_likelihood: f64, estimate: &DVector<f64>) {
        self.rows.push(TraceRow {
            iteration,
            log_likelihood: Some(log_likelihood),
            params: estimate.iter().copied().collect(),
        });
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the trace has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Log-likelihood column (`None` in row 0).
    pub fn log_likelihoods(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.log_likelihood).collect()
    }

    /// Values of one parameter across rows, or `None` for an unknown name.
    pub fn param_column(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.param_names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|r| r.params[i]).collect())
    }

    /// Last row.
    pub fn last(&self) -> Option<&TraceRow> {
        self.rows.last()
    }
}

/// Complete result of an iterated unadapted bagged filter run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IubfOutput {
    /// Natural-scale starting parameters.
    pub start: DVector<f64>,
    /// Parameter names, in vector order.
    pub param_names: Vec<String>,
    /// Configuration the run used.
    pub config: IubfConfig,
    /// Per-iteration trace.
    pub trace: Trace,
    /// Final swarm (estimation scale).
    pub swarm: ParameterSwarm,
    /// Final natural-scale estimate.
    pub estimate: DVector<f64>,
    /// Log-likelihood of the final sweep.
    pub log_likelihood: f64,
    /// Per-time log-likelihood increments of the final sweep.
    pub step_log_likelihoods: Vec<f64>,
    /// Total number of sweeps, including those of resumed runs.
    pub iterations_done: usize,
}

impl IubfOutput {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Look up one estimated parameter by name.
    pub fn estimate_of(&self, name: &str) -> Option<f64> {
        let i = self.param_names.iter().position(|n| n == name)?;
        Some(self.estimate[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_rows() {
        let names = vec!["a".to_string(), "b".to_string()];
        let mut trace = Trace::starting_at(names, &DVector::from_vec(vec![1.0, 2.0]));
        trace.push(1, -10.0, &DVector::from_vec(vec![1.5, 2.5]));
        trace.push(2, -9.0, &DVector::from_vec(vec![1.7, 2.4]));

        assert_eq!(trace.len(), 3);
        assert_eq!(trace.log_likelihoods(), vec![None, Some(-10.0), Some(-9.0)]);
        assert_eq!(trace.param_column("b"), Some(vec![2.0, 2.5, 2.4]));
        assert_eq!(trace.param_column("c"), None);
        assert_eq!(trace.last().map(|r| r.iteration), Some(2));
    }

    #[test]
    fn test_trace_json_marks_missing_loglik() {
        let trace = Trace::starting_at(vec!["a".into()], &DVector::from_vec(vec![0.5]));
        let json = serde_json::to_string(&trace).unwrap();
        assert!(json.contains("\"log_likelihood\":null"));
    }
}
