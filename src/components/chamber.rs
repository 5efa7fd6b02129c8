//! Cardiac chamber with time-varying elastance and viscous loss.
//!
//! Pressure-volume law, with the viscous term linearized around the
//! previous step:
//!
//! ```text
//! p = E(t)·(V/V0 − 1) + K·p_prev·(V − V_prev)/dt
//! ```

use super::elastance::Elastance;
use crate::circuit::{require_non_negative, require_positive};
use crate::error::Result;
use crate::solver::CircuitMatrix;

/// Atrium or ventricle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chamber {
    pub elastance: Elastance,
    /// Reference volume V0
    pub reference_volume: f64,
    /// Viscous coefficient K
    pub viscosity: f64,
}

impl Chamber {
    pub fn new(elastance: Elastance, reference_volume: f64, viscosity: f64) -> Result<Self> {
        let chamber = Self {
            elastance,
            reference_volume,
            viscosity,
        };
        chamber.validate()?;
        Ok(chamber)
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("V0", self.reference_volume)?;
        require_non_negative("K", self.viscosity)
    }

    /// Pressure implied by the law at time `t`, for checking solutions.
    pub fn pressure(&self, t: f64, volume: f64, p_prev: f64, v_prev: f64, dt: f64) -> f64 {
        let e = self.elastance.at(t);
        e * (volume / self.reference_volume - 1.0) + self.viscosity * p_prev * (volume - v_prev) / dt
    }

    /// Stamp the pressure-volume law at time `t` into `row`:
    ///
    ///   p − (E/V0 + K·p_prev/dt)·V = −E − K·p_prev·V_prev/dt
    #[allow(clippy::too_many_arguments)]
    pub fn stamp(
        &self,
        matrix: &mut CircuitMatrix,
        row: usize,
        pressure: usize,
        volume: usize,
        t: f64,
        p_prev: f64,
        v_prev: f64,
        dt: f64,
    ) {
        let e = self.elastance.at(t);
        let damping = self.viscosity * p_prev / dt;
        matrix.add(row, pressure, 1.0);
        matrix.add(row, volume, -(e / self.reference_volume + damping));
        matrix.add_rhs(row, -e - damping * v_prev);
    }
}
