//! Configuration for the iterated bagged filter.
//!
//! [`IubfConfig`] bundles every setting the filter needs and is threaded
//! explicitly through each call. It is validated eagerly, before any
//! simulation work, and serialized into the run output.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::cooling::CoolingSchedule;
use super::errors::{IubfError, IubfResult};
use crate::common::constants::{
    DEFAULT_DENSITY_TOL, DEFAULT_ELITE_PROPORTION, DEFAULT_SEED, MIN_PARAM_GROUPS,
};

/// How a random-walk standard deviation is applied over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RwSdKind {
    /// Same sd at every observation time
    Constant {
        /// Standard deviation
        sd: f64,
    },
    /// Only perturbed at the first observation time (initial-value parameters)
    InitialValue {
        /// Standard deviation
        sd: f64,
    },
    /// Explicit sd for every observation time
    PerTime {
        /// One sd per observation time
        sds: Vec<f64>,
    },
}

/// Random-walk sd for one named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RwSdEntry {
    /// Parameter name (must match the model)
    pub param: String,
    /// How the sd is spread over time
    #[serde(flatten)]
    pub kind: RwSdKind,
}

/// Random-walk standard deviations, per parameter and per time.
///
/// Parameters without an entry are not perturbed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RwSdSchedule {
    /// Named entries
    pub entries: Vec<RwSdEntry>,
}

impl RwSdSchedule {
    /// Empty schedule (no perturbation).
    pub fn new() -> Self {
        Self::default()
    }

    /// Perturb `param` with `sd` at every time.
    pub fn constant(mut self, param: impl Into<String>, sd: f64) -> Self {
        self.entries.push(RwSdEntry {
            param: param.into(),
            kind: RwSdKind::Constant { sd },
        });
        self
    }

    /// Perturb `param` with `sd` at the first time only.
    pub fn initial_value(mut self, param: impl Into<String>, sd: f64) -> Self {
        self.entries.push(RwSdEntry {
            param: param.into(),
            kind: RwSdKind::InitialValue { sd },
        });
        self
    }

    /// Perturb `param` with an explicit sd per time.
    pub fn per_time(mut self, param: impl Into<String>, sds: Vec<f64>) -> Self {
        self.entries.push(RwSdEntry {
            param: param.into(),
            kind: RwSdKind::PerTime { sds },
        });
        self
    }

    /// Resolve into a `params × times` matrix for the given parameter names.
    pub fn resolve(&self, param_names: &[String], num_times: usize) -> IubfResult<DMatrix<f64>> {
        let mut sd = DMatrix::zeros(param_names.len(), num_times);
        for entry in &self.entries {
            let row = param_names
                .iter()
                .position(|n| *n == entry.param)
                .ok_or_else(|| {
                    IubfError::config(
                        "rw.sd",
                        format!(
                            "unknown parameter '{}' (model has {:?})",
                            entry.param, param_names
                        ),
                    )
                })?;
            match &entry.kind {
                RwSdKind::Constant { sd: s } => {
                    check_sd(&entry.param, *s)?;
                    sd.row_mut(row).fill(*s);
                }
                RwSdKind::InitialValue { sd: s } => {
                    check_sd(&entry.param, *s)?;
                    if num_times > 0 {
                        sd[(row, 0)] = *s;
                    }
                }
                RwSdKind::PerTime { sds } => {
                    if sds.len() != num_times {
                        return Err(IubfError::config(
                            "rw.sd",
                            format!(
                                "parameter '{}' has {} sds for {} observation times",
                                entry.param,
                                sds.len(),
                                num_times
                            ),
                        ));
                    }
                    for (t, s) in sds.iter().enumerate() {
                        check_sd(&entry.param, *s)?;
                        sd[(row, t)] = *s;
                    }
                }
            }
        }
        Ok(sd)
    }
}

fn check_sd(param: &str, sd: f64) -> IubfResult<()> {
    if !(sd.is_finite() && sd >= 0.0) {
        return Err(IubfError::config(
            "rw.sd",
            format!("sd for '{param}' must be finite and non-negative, got {sd}"),
        ));
    }
    Ok(())
}

/// Complete filter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IubfConfig {
    /// Number of outer iterations (`Nubf`)
    pub iterations: usize,
    /// Replicates per parameter group (`Nrep_per_param`)
    pub reps_per_param: usize,
    /// Number of parameter groups (`Nparam`)
    pub num_params: usize,
    /// Proportion of groups kept as the elite at each resampling
    pub prop: f64,
    /// Random-walk standard deviations
    pub rw_sd: RwSdSchedule,
    /// Cooling of the random walk
    pub cooling: CoolingSchedule,
    /// Density floor; non-finite log-densities become `ln(tol)`
    pub tol: f64,
    /// Master RNG seed
    pub seed: u64,
}

impl Default for IubfConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            reps_per_param: 10,
            num_params: 10,
            prop: DEFAULT_ELITE_PROPORTION,
            rw_sd: RwSdSchedule::default(),
            cooling: CoolingSchedule::default(),
            tol: DEFAULT_DENSITY_TOL,
            seed: DEFAULT_SEED,
        }
    }
}

impl IubfConfig {
    /// Create a configuration with the three size settings.
    pub fn new(iterations: usize, num_params: usize, reps_per_param: usize) -> Self {
        Self {
            iterations,
            num_params,
            reps_per_param,
            ..Self::default()
        }
    }

    /// Set the elite proportion.
    pub fn with_prop(mut self, prop: f64) -> Self {
        self.prop = prop;
        self
    }

    /// Set the random-walk schedule.
    pub fn with_rw_sd(mut self, rw_sd: RwSdSchedule) -> Self {
        self.rw_sd = rw_sd;
        self
    }

    /// Set the cooling schedule.
    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    /// Set the density floor.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the master RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Total replicates per sweep.
    #[inline]
    pub fn total_reps(&self) -> usize {
        self.num_params * self.reps_per_param
    }

    /// Log of the density floor.
    #[inline]
    pub fn log_tol(&self) -> f64 {
        self.tol.ln()
    }

    /// Check every setting that does not depend on the model.
    pub fn validate(&self) -> IubfResult<()> {
        if self.iterations < 1 {
            return Err(IubfError::config("Nubf", "must be at least 1"));
        }
        if self.num_params < MIN_PARAM_GROUPS {
            return Err(IubfError::config(
                "Nparam",
                format!("must be at least {MIN_PARAM_GROUPS}, got {}", self.num_params),
            ));
        }
        if self.reps_per_param < 1 {
            return Err(IubfError::config("Nrep_per_param", "must be at least 1"));
        }
        if !(self.prop > 0.0 && self.prop <= 1.0) {
            return Err(IubfError::config(
                "prop",
                format!("must be in (0, 1], got {}", self.prop),
            ));
        }
        self.cooling.validate()?;
        if !(self.tol.is_finite() && self.tol > 0.0) || !self.log_tol().is_finite() {
            return Err(IubfError::config(
                "tol",
                format!("must be positive with a finite logarithm, got {}", self.tol),
            ));
        }
        Ok(())
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
