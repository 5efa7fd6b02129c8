//! Parameter studies built on the solvers.
//!
//! This module provides the numeric side of the exploratory tools:
//! - One-at-a-time sweeps of the steady-state and oxygen inputs
//! - A two-input grid over the compartment model
//! - Monte Carlo sampling of patient variability and drug response
//!
//! Results are plain data; rendering them is left to the caller.

mod grid;
mod monte_carlo;
mod sweep;

pub use grid::{grid_compartment, CompartmentGrid, CompartmentInput};
pub use monte_carlo::{
    run_monte_carlo, MonteCarloConfig, MonteCarloOutput, MonteCarloResult, MonteCarloSample,
    PatientVariability, Summary,
};
pub use sweep::{sweep, sweep_all, sweep_factors, SweepParameter, SweepPoint, SWEEP_STEPS};
