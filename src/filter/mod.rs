//! Iterated unadapted bagged filter
//!
//! This module provides the filter and its building blocks:
//!
//! - [`Iubf`] - Outer iteration driver
//! - [`UnadaptedBaggedFilter`] - One sweep over every observation time
//! - [`SpatialModel`] / [`ParameterTransform`] - What the filter consumes
//! - [`Neighborhood`] - Which unit-time pairs condition each unit's weight
//! - [`TaskScheduler`] - How per-group tasks are dispatched
//!
//! # Components
//!
//! - `cooling` - Random-walk cooling multiplier
//! - `perturbation` - Gaussian random walk on the swarm
//! - `combiner` - Neighborhood-weighted group log-weights
//! - `history` - Past conditional densities aligned with the replicates
//! - `resampler` - Quantile elite resampling of parameter groups

pub mod bagged;
pub mod combiner;
pub mod config;
pub mod cooling;
pub mod driver;
pub mod errors;
pub mod history;
pub mod neighborhood;
pub mod output;
pub mod perturbation;
pub mod population;
pub mod resampler;
pub mod scheduler;
pub mod traits;
pub mod transform;

pub use bagged::{StepDiagnostics, SweepOutcome, UnadaptedBaggedFilter};
pub use config::{IubfConfig, RwSdEntry, RwSdKind, RwSdSchedule};
pub use cooling::{CoolingKind, CoolingSchedule};
pub use driver::Iubf;
pub use errors::{IubfError, IubfResult, ModelError};
pub use history::HistoryBuffer;
pub use neighborhood::{EmptyNeighborhood, LaggedNeighborhood, NeighborList, Neighborhood};
pub use output::{IubfOutput, Trace, TraceRow};
pub use population::ParameterSwarm;
pub use resampler::{elite_resample, EliteSelection};
#[cfg(feature = "rayon")]
pub use scheduler::ParallelScheduler;
pub use scheduler::{DefaultScheduler, SequentialScheduler, TaskScheduler};
pub use traits::{ParameterTransform, SpatialModel};
pub use transform::{CoordinateTransform, IdentityTransform, Scale};
