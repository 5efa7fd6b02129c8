//! Component models for the time-dependent simulators.
//!
//! This module provides the pieces that do more than a plain resistance or
//! compliance row:
//! - Waveforms: the driving aortic outflow (or any `Fn(f64) -> f64`)
//! - Elastance: double-Hill activation scaled between E_min and E_max
//! - Chamber: atrium/ventricle pressure-volume law
//! - Valve: inertance, Bernoulli loss and a smooth opening function
//!
//! Chambers and valves stamp their discretized laws into a
//! [`CircuitMatrix`](crate::solver::CircuitMatrix) row.

mod chamber;
mod elastance;
mod valve;
mod waveform;

pub use chamber::Chamber;
pub use elastance::{Elastance, HillActivation, NORMALIZATION_SAMPLES};
pub use valve::Valve;
pub use waveform::{AorticOutflow, Waveform};
