//! A discrete-event limit order book simulator: a price-time-priority book,
//! a matching engine, a seeded stochastic flow generator (with an informed
//! cohort for adverse-selection studies), and a single market-making agent
//! quoting against it.
//!
//! The crate is a library only. Wiring a [`config::SimConfig`] together —
//! from a file, from argv, from a hardcoded experiment — and deciding what
//! to do with the output streams (print them, write CSV, feed a plotter) is
//! a collaborator's job; see `demos/run_simulation.rs` for the minimal one.

pub mod config;
pub mod engine;
pub mod errors;
pub mod flow;
pub mod market_maker;
pub mod metrics;
pub mod orderbook;
pub mod orders;
pub mod scheduler;
pub mod trade;

/// Fallback reference price used only when the book has never seen both
/// sides (so no mid can be computed yet) — at the very start of a run,
/// before the first level has rested on each side.
pub(crate) const DEFAULT_REFERENCE_PRICE: f64 = 100.0;

pub use config::SimConfig;
pub use errors::ConfigError;
pub use metrics::Summary;
pub use scheduler::{Scheduler, SimulationOutput};

/// Validates `config` and runs it to completion, returning the full event
/// and trade streams plus their summary. This is the one call a
/// collaborator needs for the common case; [`Scheduler`] is available
/// directly for anyone who wants to step the simulation by hand.
pub fn run(config: SimConfig) -> Result<SimulationOutput, ConfigError> {
    config.validate()?;
    Ok(Scheduler::new(config).run())
}
