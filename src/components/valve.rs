//! Smoothly opening cardiac valve with inertance and Bernoulli loss.
//!
//! Flow through the valve obeys
//!
//! ```text
//! L·dQ/dt + B·|Q|·Q + R·Q = H(Δp)·Δp,    H(Δp) = 1/(1 + exp(−γ·Δp))
//! ```
//!
//! Discretized with backward Euler, linearizing `|Q|` and the opening
//! `H` around the previous step:
//!
//! ```text
//! (L/dt + B·|Q_prev| + R)·Q − H(Δp_prev)·(p_up − p_down) = L·Q_prev/dt
//! ```

use serde::{Deserialize, Serialize};

use crate::circuit::{require_non_negative, require_positive};
use crate::error::Result;
use crate::solver::CircuitMatrix;

/// Valve between two chambers (or a chamber and an artery).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valve {
    /// Inertance L
    pub inertance: f64,
    /// Bernoulli coefficient B
    pub bernoulli: f64,
    /// Viscous resistance R
    pub resistance: f64,
    /// Opening steepness γ
    pub steepness: f64,
}

impl Valve {
    /// Validate, naming fields with `suffix` ("int" gives "L_int").
    pub fn validate(&self, suffix: &str) -> Result<()> {
        require_non_negative(&format!("L_{suffix}"), self.inertance)?;
        require_non_negative(&format!("B_{suffix}"), self.bernoulli)?;
        require_positive(&format!("R_{suffix}"), self.resistance)?;
        require_positive(&format!("gamma_{suffix}"), self.steepness)
    }

    /// Fraction open at pressure difference `dp`, in (0, 1).
    pub fn opening(&self, dp: f64) -> f64 {
        // Written so that exp never overflows
        if dp >= 0.0 {
            1.0 / (1.0 + (-self.steepness * dp).exp())
        } else {
            let e = (self.steepness * dp).exp();
            e / (1.0 + e)
        }
    }

    /// Coefficient of the unknown flow for a step of size `dt`.
    pub fn flow_coefficient(&self, q_prev: f64, dt: f64) -> f64 {
        self.inertance / dt + self.bernoulli * q_prev.abs() + self.resistance
    }

    /// Stamp the discretized valve law into `row`.
    #[allow(clippy::too_many_arguments)]
    pub fn stamp(
        &self,
        matrix: &mut CircuitMatrix,
        row: usize,
        flow: usize,
        upstream: usize,
        downstream: usize,
        q_prev: f64,
        dp_prev: f64,
        dt: f64,
    ) {
        let h = self.opening(dp_prev);
        matrix.add(row, flow, self.flow_coefficient(q_prev, dt));
        matrix.add(row, upstream, -h);
        matrix.add(row, downstream, h);
        matrix.add_rhs(row, self.inertance * q_prev / dt);
    }
}
