//! Two-compartment oxygen balance.

use super::matrix::CircuitMatrix;
use crate::circuit::{require_all_positive, OxygenParams, OxygenSolution};
use crate::error::Result;
use crate::OXYGEN_BINDING_CAPACITY;

const S_M: usize = 0;
const S_SV: usize = 1;

/// Solve for mixed and systemic venous saturation given the flow split.
///
/// Rows:
///   (Q_s + Q_p)·S_m − Q_s·S_sv           = Q_p·S_pv   (mixing)
///   1.34·Hb·Q_s·S_m − 1.34·Hb·Q_s·S_sv   = CVO2       (Fick)
pub fn solve_saturation(q_s: f64, q_p: f64, params: &OxygenParams) -> Result<OxygenSolution> {
    require_all_positive(&[("Q_s", q_s), ("Q_p", q_p)])?;
    params.validate()?;

    let uptake = OXYGEN_BINDING_CAPACITY * params.hemoglobin * q_s;
    let mut m = CircuitMatrix::new(2);
    m.stamp_sum(0, &[(S_M, q_s + q_p), (S_SV, -q_s)], q_p * params.s_pv);
    m.stamp_sum(1, &[(S_M, uptake), (S_SV, -uptake)], params.consumption);

    let x = m.solve_exact()?;
    let s_m = x[S_M];
    let solution = OxygenSolution {
        s_m,
        s_sv: x[S_SV],
        delivery: uptake * s_m,
    };
    log::debug!("Saturation Q_s={} Q_p={} -> {:?}", q_s, q_p, solution);
    Ok(solution)
}
