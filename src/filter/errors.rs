//! Error types for the bagged filter and the models it drives.
//!
//! Configuration problems are caught before any simulation starts. Model
//! failures abort the sweep with the time and parameter group attached.
//! Non-finite densities are not errors: they are floored.

use thiserror::Error;

/// Crate-wide result alias.
pub type IubfResult<T> = Result<T, IubfError>;

/// Errors raised by model callables (initializer, process, measurement).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// Initial state sampling failed
    #[error("initial state sampling failed: {0}")]
    Initialization(String),

    /// Process simulation failed
    #[error("process simulation failed: {0}")]
    Process(String),

    /// Measurement density evaluation failed
    #[error("measurement density evaluation failed: {0}")]
    Measurement(String),
}

/// Errors that can occur while running the filter
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IubfError {
    /// A required setting is missing or out of range
    #[error("configuration error in `{setting}`: {reason}")]
    Configuration {
        /// Name of the offending setting
        setting: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// A model returned data of the wrong shape
    #[error("dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which quantity (e.g. "state rows", "density rows")
        context: String,
        /// What was expected
        expected: usize,
        /// What was received
        actual: usize,
    },

    /// The model failed while computing weights
    #[error("weight evaluation failed at time index {time} for parameter {param}: {source}")]
    ModelEvaluation {
        /// Observation time index (0-based)
        time: usize,
        /// Parameter group index
        param: usize,
        /// Underlying model error
        #[source]
        source: ModelError,
    },

    /// The neighborhood function returned an unusable entry
    #[error("invalid neighborhood at time index {time}, unit {unit}: {reason}")]
    Neighborhood {
        /// Observation time index (0-based)
        time: usize,
        /// Spatial unit
        unit: usize,
        /// What is wrong with it
        reason: String,
    },
}

impl IubfError {
    /// Shorthand for a configuration error.
    pub fn config(setting: &'static str, reason: impl Into<String>) -> Self {
        IubfError::Configuration {
            setting,
            reason: reason.into(),
        }
    }

    /// Shorthand for a dimension mismatch.
    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        IubfError::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}
