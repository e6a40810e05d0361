//! Task scheduling for per-group work.
//!
//! Within one observation time every parameter group is processed
//! independently: initial sampling, state advance, density evaluation and
//! the group's weight. A [`TaskScheduler`] runs one task per group index
//! and returns the results in index order. Tasks share no mutable state.
//!
//! # Scheduler Types
//!
//! - [`SequentialScheduler`]: runs the tasks in a plain loop.
//! - [`ParallelScheduler`]: runs the tasks on a rayon pool (feature `rayon`).
//!
//! Both give identical results, because every task draws from its own
//! RNG stream derived from the group index.

#[cfg(feature = "rayon")]
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "rayon")]
use super::errors::{IubfError, IubfResult};

/// Runs independent indexed tasks and gathers their results in order.
pub trait TaskScheduler: Send + Sync {
    /// Returns a human-readable name for this scheduler.
    fn name(&self) -> &'static str;

    /// Returns true if tasks may run concurrently.
    fn is_parallel(&self) -> bool;

    /// Run `task(i)` for `i in 0..n`; element `i` of the result is `task(i)`.
    fn map<T, F>(&self, n: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync;
}

/// Runs tasks one after another on the calling thread.
///
/// # Example
///
/// ```
/// use iubf::filter::{SequentialScheduler, TaskScheduler};
///
/// let scheduler = SequentialScheduler;
/// assert_eq!(scheduler.map(4, |i| i * i), vec![0, 1, 4, 9]);
/// assert!(!scheduler.is_parallel());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialScheduler;

impl TaskScheduler for SequentialScheduler {
    fn name(&self) -> &'static str {
        "Sequential"
    }

    fn is_parallel(&self) -> bool {
        false
    }

    fn map<T, F>(&self, n: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..n).map(task).collect()
    }
}

/// Runs tasks on a rayon thread pool.
///
/// Uses the global pool unless built with [`ParallelScheduler::with_threads`].
#[cfg(feature = "rayon")]
#[derive(Debug, Clone, Default)]
pub struct ParallelScheduler {
    pool: Option<Arc<rayon::ThreadPool>>,
}

#[cfg(feature = "rayon")]
impl ParallelScheduler {
    /// Scheduler on the global rayon pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler on a dedicated pool of `threads` workers.
    pub fn with_threads(threads: usize) -> IubfResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| IubfError::config("threads", e.to_string()))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    /// Number of worker threads available.
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

#[cfg(feature = "rayon")]
impl TaskScheduler for ParallelScheduler {
    fn name(&self) -> &'static str {
        "Parallel"
    }

    fn is_parallel(&self) -> bool {
        true
    }

    fn map<T, F>(&self, n: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        match &self.pool {
            Some(pool) => pool.install(|| (0..n).into_par_iter().map(&task).collect()),
            None => (0..n).into_par_iter().map(task).collect(),
        }
    }
}

/// Scheduler used when none is given: parallel with `rayon`, sequential otherwise.
#[cfg(feature = "rayon")]
pub type DefaultScheduler = ParallelScheduler;

/// Scheduler used when none is given: parallel with `rayon`, sequential otherwise.
#[cfg(not(feature = "rayon"))]
pub type DefaultScheduler = SequentialScheduler;
