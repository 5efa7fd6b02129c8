//! Circuit equation solvers.
//!
//! This module provides the numerical engine for every model in the crate.
//!
//! ## Circuit equations
//!
//! Each model assembles a dense system Ax = z in which every row is one
//! lumped-parameter law:
//!
//! ```text
//! resistance      R·Q − P_up + P_down             = 0
//! flow balance    Σ Q_in − Σ Q_out                = Q_forcing
//! compliance      C·P − dt·Q_in + dt·Q_out        = C·P_prev
//! volume          Σ C·P (+ chamber volumes)       = V_total
//! ```
//!
//! Steady-state systems are square and nonsingular and are solved exactly
//! by LU decomposition. Time-stepped systems can carry a redundant flow
//! identity and are solved by least squares. The compartment model is
//! nonlinear in form and goes through [`NewtonRaphson`].

mod compartment;
mod compliance;
mod extended;
mod matrix;
mod newton;
mod oxygen;
mod simulator;
mod steady;

pub use compartment::{
    solve_compartment, solve_flows, solve_saturations, CompartmentSolution,
};
pub use compliance::{
    estimate_arterial_venous, estimate_diastolic, ArterialVenousEstimate, DiastolicEstimate,
    VENOUS_TO_ARTERIAL_RATIO,
};
pub use extended::{simulate_extended, ExtendedModel, ExtendedSimulator, ExtendedState};
pub use matrix::{least_squares, CircuitMatrix, LeastSquares, PIVOT_TOLERANCE};
pub use newton::{NewtonConfig, NewtonRaphson, RootSolution};
pub use oxygen::solve_saturation;
pub use simulator::{simulate_shunt, ShuntSimulator, TimeSeries, MAX_STEPS};
pub use steady::solve_flow_pressure;

/// Relative step tolerance of the Newton root-finder.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Residual evaluation budget of the Newton root-finder.
pub const DEFAULT_MAX_EVALUATIONS: usize = 1000;
