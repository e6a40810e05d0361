/*!
# iubf - Iterated unadapted bagged filter

Parameter estimation for spatiotemporal partially observed Markov
processes (SpatPOMPs): many spatial units, each with its own latent state
and measurements, observed at a common sequence of times.

The iterated unadapted bagged filter (IUBF) carries a swarm of parameter
vectors, each with a block of simulated replicates. At every observation
time the swarm is perturbed by a cooled random walk, every replicate is
simulated forward, and each parameter vector is scored by a
neighborhood-weighted likelihood. The best-scoring share of the swarm is
kept and the rest is resampled from it. Repeating this sweep drives the
swarm toward high-likelihood regions.

## Modules

- [`filter`] - The filter: driver, single sweep, combiner, resampler
- [`models`] - Reference models (correlated Brownian motion)
- [`reporter`] - Progress callbacks and logging
- [`common`] - Numerical helpers, constants, deterministic RNG

## Example

```rust,no_run
use iubf::common::rng::SimpleRng;
use iubf::filter::{Iubf, IubfConfig, LaggedNeighborhood, RwSdSchedule};
use iubf::models::BrownianMotionModel;
use iubf::reporter::LoggingReporter;
use nalgebra::DVector;

let truth = DVector::from_vec(vec![0.4, 1.0, 1.0, 0.0]);
let mut rng = SimpleRng::new(1);
let model = BrownianMotionModel::simulated(10, 30, &truth, &mut rng).unwrap();
let transform = model.transform();

let config = IubfConfig::new(10, 30, 20)
    .with_rw_sd(
        RwSdSchedule::new()
            .constant("rho", 0.02)
            .constant("sigma", 0.02)
            .constant("tau", 0.02)
            .initial_value("x0", 0.1),
    )
    .with_seed(2);

let iubf = Iubf::new(model, transform, LaggedNeighborhood::new(1, 1), config).unwrap();
let start = DVector::from_vec(vec![0.3, 1.5, 0.8, 0.0]);
let output = iubf.run_with_reporter(&start, &mut LoggingReporter::new()).unwrap();
println!("loglik {:.2}, estimate {:?}", output.log_likelihood, output.estimate.as_slice());
```
*/

// ============================================================================
// Core modules
// ============================================================================

/// Iterated unadapted bagged filter and its components
pub mod filter;

/// Reference spatiotemporal models
pub mod models;

/// Observability callbacks
pub mod reporter;

/// Low-level utilities (numerics, RNG, constants)
pub mod common;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// Driver and results
pub use filter::{Iubf, IubfOutput, Trace, TraceRow, UnadaptedBaggedFilter};

// Configuration
pub use filter::{CoolingKind, CoolingSchedule, IubfConfig, RwSdSchedule};

// Errors
pub use filter::{IubfError, IubfResult, ModelError};

// Traits
pub use filter::{Neighborhood, ParameterTransform, SpatialModel, TaskScheduler};

// Reporters
pub use reporter::{LoggingReporter, NoOpReporter, SweepReporter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
