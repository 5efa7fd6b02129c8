//! Steady-state flow/pressure solver.
//!
//! Four unknowns (Q_s, Q_p, P_a, P_v) and four equations:
//!
//! ```text
//! Q_s + Q_p = HR·SV            (ventricular output, SV from the closure)
//! R_p·Q_p   = P_a − P_v        (pulmonary resistance drop)
//! R_s·Q_s   = P_a − P_v        (systemic resistance drop)
//! C_A·P_a + C_V·P_v = V_total  (volume constraint)
//! ```

use super::matrix::CircuitMatrix;
use crate::circuit::{SteadyStateParams, SteadyStateSolution, StrokeVolumeClosure};
use crate::error::Result;

const Q_S: usize = 0;
const Q_P: usize = 1;
const P_A: usize = 2;
const P_V: usize = 3;

/// Assemble the 4×4 steady-state system.
pub fn assemble(params: &SteadyStateParams) -> CircuitMatrix {
    let hr = params.heart_rate;
    let mut m = CircuitMatrix::new(4);

    // Flow balance: Q_s + Q_p − HR·SV = 0
    let (sv_p_a, sv_p_v) = match params.closure {
        StrokeVolumeClosure::Compliance { c_sys } => (-c_sys, params.c_dia),
        StrokeVolumeClosure::EjectionFraction { ef } => (0.0, ef * params.c_dia),
    };
    m.stamp_sum(0, &[(Q_S, 1.0), (Q_P, 1.0), (P_A, -hr * sv_p_a), (P_V, -hr * sv_p_v)], 0.0);

    m.stamp_resistance(1, Q_P, params.r_p, P_A, P_V);
    m.stamp_resistance(2, Q_S, params.r_s, P_A, P_V);
    m.stamp_sum(3, &[(P_A, params.c_a), (P_V, params.c_v)], params.v_total);
    m
}

/// Solve for systemic/pulmonary flow and arterial/venous pressure.
///
/// Inputs are validated first; an exactly singular system is reported as
/// [`NorwoodError::SingularMatrix`](crate::NorwoodError::SingularMatrix).
pub fn solve_flow_pressure(params: &SteadyStateParams) -> Result<SteadyStateSolution> {
    params.validate()?;
    let x = assemble(params).solve_exact()?;
    let solution = SteadyStateSolution {
        q_s: x[Q_S],
        q_p: x[Q_P],
        p_a: x[P_A],
        p_v: x[P_V],
    };
    log::debug!("Steady state {:?} -> {:?}", params.closure, solution);
    Ok(solution)
}
