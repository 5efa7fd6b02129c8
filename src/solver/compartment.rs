//! Nonlinear multi-compartment solver.
//!
//! Flow/pressure unknowns (Q_v, Q_u, Q_l, Q_p, P_sa, P_pa, P_pv):
//!
//! ```text
//! Q_v = HR·(C_d·P_pv − C_s·P_sa)       venous return
//! Q_v = Q_u + Q_l                      body split
//! Q_p = Q_v                            single ventricle
//! PVR·Q_p = P_pa − P_pv
//! UVR·Q_u = P_sa − P_pa
//! LVR·Q_l = P_sa − P_pa
//! 1 = C_sa·P_sa + C_pv·P_pv + C_pa·P_pa
//! ```
//!
//! Saturation unknowns (S_pa, S_pv, S_svu, S_svl):
//!
//! ```text
//! CVO2u = 1.34·Hb/100·Q_u·1000·(S_sa − S_svu)
//! CVO2l = 1.34·Hb/100·Q_l·1000·(S_sa − S_svl)
//! Q_p·S_pa = Q_u·S_svu + Q_l·S_svl
//! S_pv = S_sa
//! ```

use serde::{Deserialize, Serialize};

use super::newton::{NewtonRaphson, RootSolution};
use crate::circuit::{
    CompartmentFlows, CompartmentOxygenParams, CompartmentParams, CompartmentSaturations,
};
use crate::error::Result;
use crate::OXYGEN_BINDING_CAPACITY;

/// Hb is in g/dL and flow in L/min; consumption is in mL O2/min.
const FICK_UNIT_SCALE: f64 = 1000.0 / 100.0;

/// Solve the flow/pressure system from `guess`.
///
/// Non-convergence is reported in the returned [`RootSolution`], not as an
/// error; invalid inputs are rejected before iterating.
pub fn solve_flows(
    params: &CompartmentParams,
    guess: CompartmentFlows,
    solver: &NewtonRaphson,
) -> Result<RootSolution<CompartmentFlows>> {
    params.validate()?;
    let c = params.compliances;
    let (hr, uvr, lvr, pvr) = (params.heart_rate, params.uvr, params.lvr, params.pvr);

    let residual = |z: &[f64], r: &mut [f64]| {
        let [q_v, q_u, q_l, q_p, p_sa, p_pa, p_pv] = [z[0], z[1], z[2], z[3], z[4], z[5], z[6]];
        r[0] = q_v - hr * (c.c_d * p_pv - c.c_s * p_sa);
        r[1] = q_u + q_l - q_v;
        r[2] = q_p - q_v;
        r[3] = pvr * q_p - (p_pa - p_pv);
        r[4] = uvr * q_u - (p_sa - p_pa);
        r[5] = lvr * q_l - (p_sa - p_pa);
        r[6] = 1.0 - (c.c_sa * p_sa + c.c_pv * p_pv + c.c_pa * p_pa);
    };

    let solution = solver.solve(residual, &guess.to_array());
    Ok(solution.map(|z| CompartmentFlows::from_slice(&z)))
}

/// Solve the saturation system for given flows.
pub fn solve_saturations(
    flows: &CompartmentFlows,
    oxygen: &CompartmentOxygenParams,
    guess: CompartmentSaturations,
    solver: &NewtonRaphson,
) -> Result<RootSolution<CompartmentSaturations>> {
    oxygen.validate()?;
    let uptake = OXYGEN_BINDING_CAPACITY * oxygen.hemoglobin * FICK_UNIT_SCALE;
    let s_sa = oxygen.s_sa;
    let f = *flows;

    let residual = |s: &[f64], r: &mut [f64]| {
        let [s_pa, s_pv, s_svu, s_svl] = [s[0], s[1], s[2], s[3]];
        r[0] = oxygen.cvo2_upper - uptake * f.q_u * (s_sa - s_svu);
        r[1] = oxygen.cvo2_lower - uptake * f.q_l * (s_sa - s_svl);
        r[2] = f.q_p * s_pa - (f.q_u * s_svu + f.q_l * s_svl);
        r[3] = s_sa - s_pv;
    };

    let solution = solver.solve(residual, &guess.to_array());
    Ok(solution.map(|s| CompartmentSaturations::from_slice(&s)))
}

/// Converged flows, saturations and derived indices of one compartment solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompartmentSolution {
    pub flows: CompartmentFlows,
    pub saturations: CompartmentSaturations,
    /// Oxygen extraction ratio (fraction)
    pub oer: f64,
}

impl CompartmentSolution {
    /// Transpulmonary gradient P_pa − P_pv.
    pub fn tpg(&self) -> f64 {
        self.flows.transpulmonary_gradient()
    }
}

/// Solve flows then saturations from the default initial guesses.
///
/// A root-find that fails to converge is returned as
/// [`NorwoodError::NonConvergence`](crate::NorwoodError::NonConvergence).
pub fn solve_compartment(
    params: &CompartmentParams,
    oxygen: &CompartmentOxygenParams,
    solver: &NewtonRaphson,
) -> Result<CompartmentSolution> {
    let flows = solve_flows(params, CompartmentFlows::default(), solver)?.into_result()?;
    let saturations =
        solve_saturations(&flows, oxygen, CompartmentSaturations::default(), solver)?
            .into_result()?;
    let oer = saturations.extraction_ratio(&flows, oxygen.s_sa);
    Ok(CompartmentSolution {
        flows,
        saturations,
        oer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::DrugEffect;
    use crate::error::NorwoodError;
    use crate::solver::NewtonConfig;
    use approx::assert_relative_eq;

    fn baseline() -> CompartmentSolution {
        solve_compartment(
            &CompartmentParams::default(),
            &CompartmentOxygenParams::default(),
            &NewtonRaphson::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_baseline_flows() {
        let sol = solve_flows(
            &CompartmentParams::default(),
            CompartmentFlows::default(),
            &NewtonRaphson::new(),
        )
        .unwrap();
        assert!(sol.converged, "{}", sol.message);

        let f = sol.value;
        assert_relative_eq!(f.q_v, 1.7086439711, max_relative = 1e-6);
        assert_relative_eq!(f.q_u, 0.7475317374, max_relative = 1e-6);
        assert_relative_eq!(f.q_l, 0.9611122337, max_relative = 1e-6);
        assert_relative_eq!(f.q_p, 1.7086439711, max_relative = 1e-6);
        assert_relative_eq!(f.p_sa, 54.60254405, max_relative = 1e-6);
        assert_relative_eq!(f.p_pa, 20.96361587, max_relative = 1e-6);
        assert_relative_eq!(f.p_pv, 3.87717616, max_relative = 1e-6);
        assert_relative_eq!(f.transpulmonary_gradient(), 17.086439711, max_relative = 1e-6);
    }

    #[test]
    fn test_baseline_saturations_and_oer() {
        let sol = baseline();
        let s = sol.saturations;
        assert_relative_eq!(s.s_pa, 0.7279435379, max_relative = 1e-6);
        assert_relative_eq!(s.s_pv, 0.99, max_relative = 1e-9);
        assert_relative_eq!(s.s_svu, 0.6572298894, max_relative = 1e-6);
        assert_relative_eq!(s.s_svl, 0.7829430423, max_relative = 1e-6);
        assert_relative_eq!(sol.oer, 0.2647034971, max_relative = 1e-6);
    }

    #[test]
    fn test_single_ventricle_balance() {
        let f = baseline().flows;
        assert_relative_eq!(f.q_p, f.q_v, max_relative = 1e-9);
        assert_relative_eq!(f.q_u + f.q_l, f.q_v, max_relative = 1e-9);
        // Upper and lower beds share one pressure drop
        assert_relative_eq!(45.0 * f.q_u, 35.0 * f.q_l, max_relative = 1e-9);
    }

    #[test]
    fn test_vasopressin() {
        let params = CompartmentParams::default().with_drug(DrugEffect::Vasopressin);
        let f = solve_flows(&params, CompartmentFlows::default(), &NewtonRaphson::new())
            .unwrap()
            .into_result()
            .unwrap();
        assert_relative_eq!(f.q_v, 1.6211689866, max_relative = 1e-6);
        assert_relative_eq!(f.p_sa, 57.55207017, max_relative = 1e-6);
        assert_relative_eq!(f.p_pa, 16.69861171, max_relative = 1e-6);
        assert_relative_eq!(f.p_pv, 4.08591699, max_relative = 1e-6);
    }

    #[test]
    fn test_budget_too_small_reports_non_convergence() {
        // One Jacobian needs 8 evaluations for 7 unknowns
        let solver = NewtonRaphson::with_config(NewtonConfig::new().with_max_evaluations(5));
        let sol = solve_flows(&CompartmentParams::default(), CompartmentFlows::default(), &solver)
            .unwrap();
        assert!(!sol.converged);
        assert!(!sol.message.is_empty());
        assert_eq!(sol.value, CompartmentFlows::default());

        let err = solve_compartment(
            &CompartmentParams::default(),
            &CompartmentOxygenParams::default(),
            &solver,
        )
        .unwrap_err();
        assert!(matches!(err, NorwoodError::NonConvergence { .. }));
    }

    #[test]
    fn test_invalid_inputs_rejected_before_iterating() {
        let params = CompartmentParams {
            pvr: 0.0,
            ..CompartmentParams::default()
        };
        let err = solve_flows(&params, CompartmentFlows::default(), &NewtonRaphson::new())
            .unwrap_err();
        assert_eq!(err.param(), Some("PVR"));

        let oxygen = CompartmentOxygenParams {
            s_sa: 1.2,
            ..CompartmentOxygenParams::default()
        };
        let err = solve_saturations(
            &CompartmentFlows::default(),
            &oxygen,
            CompartmentSaturations::default(),
            &NewtonRaphson::new(),
        )
        .unwrap_err();
        assert_eq!(err.param(), Some("S_sa"));
    }
}
