//! # Norwood Core
//!
//! Lumped-parameter solvers for the Norwood single-ventricle circulation.
//!
//! This library provides:
//! - Steady-state flow/pressure and oxygen saturation solvers
//! - A nonlinear multi-compartment model (upper body, lower body, lungs)
//! - Compliance estimation from noisy pressure samples
//! - Backward-Euler time-dependent simulators, from a shunted two-artery
//!   circuit up to a 14-state model with chambers and valves
//! - Parameter sweeps, two-input grids and Monte Carlo studies
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Parameter sets, solution vectors, presets and validation
//! - [`components`] - Waveforms, elastance, chambers and valves
//! - [`solver`] - Linear circuit solver, Newton root-finder and the models
//! - [`study`] - Sweeps, grids and Monte Carlo
//!
//! ## Usage
//!
//! ```no_run
//! use norwood_core::circuit::{OxygenParams, SteadyStateParams};
//! use norwood_core::solver::{solve_flow_pressure, solve_saturation};
//!
//! let flow = solve_flow_pressure(&SteadyStateParams::default())?;
//! let oxygen = solve_saturation(flow.q_s, flow.q_p, &OxygenParams::default())?;
//! println!("Qp/Qs = {:.2}, S_m = {:.3}", flow.flow_ratio(), oxygen.s_m);
//! # Ok::<(), norwood_core::NorwoodError>(())
//! ```
//!
//! ## Units
//!
//! Flows are in L/min, pressures in mmHg, resistances in Wood units,
//! heart rate in beats/min and time in minutes.

pub mod circuit;
pub mod components;
pub mod error;
pub mod solver;
pub mod study;

// Re-export main types for convenience
pub use circuit::{ModelConfig, Preset};
pub use error::{NorwoodError, Result};
pub use solver::{NewtonConfig, NewtonRaphson};

/// Oxygen bound per gram of hemoglobin (mL O2/g)
pub const OXYGEN_BINDING_CAPACITY: f64 = 1.34;

/// Pulmonary venous saturation assumed by the oxygen balance
pub const DEFAULT_PULMONARY_VENOUS_SATURATION: f64 = 0.99;
