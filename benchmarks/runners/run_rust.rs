//! Runner for the iterated bagged filter on the Brownian motion model.
//!
//! Usage:
//!     run_iubf [--scenario <path>] [--units N] [--times T] [--sequential]
//!
//! Simulates data from the reference model at the true parameters, runs
//! the filter from the starting parameters and prints the output as JSON.
//! Progress goes to the log (set `RUST_LOG=info` or `debug`). Elapsed time
//! in milliseconds is printed to stderr.

use std::fs;
use std::time::Instant;

use clap::Parser;
use nalgebra::DVector;
use serde::Deserialize;

use iubf::common::rng::SimpleRng;
use iubf::filter::{
    Iubf, IubfConfig, IubfOutput, LaggedNeighborhood, RwSdSchedule, SequentialScheduler,
};
use iubf::models::BrownianMotionModel;
use iubf::reporter::LoggingReporter;

// =============================================================================
// CLI Arguments
// =============================================================================

#[derive(Parser)]
#[command(name = "run_iubf")]
#[command(about = "Iterated unadapted bagged filter on a correlated Brownian motion")]
struct Args {
    /// Path to scenario JSON file (overrides the size flags)
    #[arg(long)]
    scenario: Option<String>,

    /// Number of spatial units
    #[arg(long, default_value_t = 10)]
    units: usize,

    /// Number of observation times
    #[arg(long, default_value_t = 20)]
    times: usize,

    /// Number of outer iterations (Nubf)
    #[arg(long, default_value_t = 5)]
    iterations: usize,

    /// Number of parameter groups (Nparam)
    #[arg(long, default_value_t = 20)]
    nparam: usize,

    /// Replicates per parameter group
    #[arg(long, default_value_t = 10)]
    reps: usize,

    /// Seed for data simulation and the filter
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Run parameter groups on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// Write the JSON output here instead of stdout
    #[arg(long)]
    output: Option<String>,

    /// Log per-step resampling details
    #[arg(long)]
    verbose: bool,
}

// =============================================================================
// JSON Schema
// =============================================================================

#[derive(Deserialize)]
struct ScenarioJson {
    units: usize,
    times: usize,
    /// `[rho, sigma, tau, x0]` used to simulate the data
    truth: [f64; 4],
    /// `[rho, sigma, tau, x0]` the filter starts from
    start: [f64; 4],
    #[serde(default)]
    data_seed: Option<u64>,
    config: IubfConfig,
}

struct Scenario {
    units: usize,
    times: usize,
    truth: DVector<f64>,
    start: DVector<f64>,
    data_seed: u64,
    config: IubfConfig,
}

fn default_rw_sd() -> RwSdSchedule {
    RwSdSchedule::new()
        .constant("rho", 0.02)
        .constant("sigma", 0.02)
        .constant("tau", 0.02)
        .initial_value("x0", 0.1)
}

fn load_scenario(args: &Args) -> Result<Scenario, Box<dyn std::error::Error>> {
    match &args.scenario {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            let json: ScenarioJson = serde_json::from_str(&content)?;
            Ok(Scenario {
                units: json.units,
                times: json.times,
                truth: DVector::from_row_slice(&json.truth),
                start: DVector::from_row_slice(&json.start),
                data_seed: json.data_seed.unwrap_or(json.config.seed),
                config: json.config,
            })
        }
        None => Ok(Scenario {
            units: args.units,
            times: args.times,
            truth: DVector::from_vec(vec![0.4, 1.0, 1.0, 0.0]),
            start: DVector::from_vec(vec![0.2, 1.5, 0.7, 0.0]),
            data_seed: args.seed,
            config: IubfConfig::new(args.iterations, args.nparam, args.reps)
                .with_rw_sd(default_rw_sd())
                .with_seed(args.seed),
        }),
    }
}

// =============================================================================
// Runner
// =============================================================================

fn run(args: &Args, scenario: Scenario) -> Result<IubfOutput, Box<dyn std::error::Error>> {
    let mut rng = SimpleRng::new(scenario.data_seed);
    let model =
        BrownianMotionModel::simulated(scenario.units, scenario.times, &scenario.truth, &mut rng)?;
    let transform = model.transform();
    let neighborhood = LaggedNeighborhood::default();
    let mut reporter = if args.verbose {
        LoggingReporter::verbose()
    } else {
        LoggingReporter::new()
    };

    log::info!(
        "Simulated {} units x {} times at truth {:?}",
        scenario.units,
        scenario.times,
        scenario.truth.as_slice()
    );

    let output = if args.sequential {
        Iubf::with_scheduler(model, transform, neighborhood, SequentialScheduler, scenario.config)?
            .run_with_reporter(&scenario.start, &mut reporter)?
    } else {
        Iubf::new(model, transform, neighborhood, scenario.config)?
            .run_with_reporter(&scenario.start, &mut reporter)?
    };
    Ok(output)
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let scenario = load_scenario(&args)?;
    let start = Instant::now();
    let output = run(&args, scenario)?;
    let elapsed_ms = start.elapsed().as_micros() as f64 / 1000.0;

    let json = output.to_json()?;
    match &args.output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    eprintln!("{:.3}", elapsed_ms);
    Ok(())
}
