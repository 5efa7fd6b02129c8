//! Parameter sets and solution vectors for the two-compartment circuits.
//!
//! Units follow the clinical convention used throughout the crate: flows in
//! L/min, pressures in mmHg, resistances in Wood units (mmHg·min/L),
//! compliances in L/mmHg (or normalized by total volume), heart rate in
//! beats/min and time in minutes.

use serde::{Deserialize, Serialize};

use super::validate::{require_all_positive, require_fraction, require_positive};
use crate::error::Result;

/// Stroke-volume relation that closes the steady-state system.
///
/// The caller selects the closure explicitly; the solver builds the matching
/// flow-balance row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrokeVolumeClosure {
    /// SV = C_dia·P_v − C_sys·P_a
    Compliance { c_sys: f64 },
    /// SV = EF·C_dia·P_v
    EjectionFraction { ef: f64 },
}

/// Inputs of the steady-state flow/pressure solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteadyStateParams {
    /// Diastolic compliance C_dia
    pub c_dia: f64,
    /// Arterial compliance C_A
    pub c_a: f64,
    /// Venous compliance C_V
    pub c_v: f64,
    /// Heart rate (beats/min)
    pub heart_rate: f64,
    /// Pulmonary resistance R_p (Wood units)
    pub r_p: f64,
    /// Systemic resistance R_s (Wood units)
    pub r_s: f64,
    /// Total blood volume
    pub v_total: f64,
    /// Stroke-volume closure
    pub closure: StrokeVolumeClosure,
}

impl Default for SteadyStateParams {
    fn default() -> Self {
        Self {
            c_dia: 6.0,
            c_a: 1.4,
            c_v: 6.0,
            heart_rate: 140.0,
            r_p: 0.34,
            r_s: 7.74,
            v_total: 420.0,
            closure: StrokeVolumeClosure::Compliance { c_sys: 1.4 },
        }
    }
}

impl SteadyStateParams {
    /// Check every input, naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        require_all_positive(&[
            ("C_dia", self.c_dia),
            ("C_A", self.c_a),
            ("C_V", self.c_v),
            ("HR", self.heart_rate),
            ("R_p", self.r_p),
            ("R_s", self.r_s),
            ("V_total", self.v_total),
        ])?;
        match self.closure {
            StrokeVolumeClosure::Compliance { c_sys } => require_positive("C_sys", c_sys),
            StrokeVolumeClosure::EjectionFraction { ef } => require_fraction("EF", ef),
        }
    }

    /// Stroke volume implied by the closure at the given pressures.
    pub fn stroke_volume(&self, p_a: f64, p_v: f64) -> f64 {
        match self.closure {
            StrokeVolumeClosure::Compliance { c_sys } => self.c_dia * p_v - c_sys * p_a,
            StrokeVolumeClosure::EjectionFraction { ef } => ef * self.c_dia * p_v,
        }
    }
}

/// Solution of the steady-state flow/pressure solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteadyStateSolution {
    /// Systemic flow Q_s
    pub q_s: f64,
    /// Pulmonary flow Q_p
    pub q_p: f64,
    /// Arterial pressure P_a
    pub p_a: f64,
    /// Venous pressure P_v
    pub p_v: f64,
}

impl SteadyStateSolution {
    /// Total ventricular output Q_s + Q_p.
    pub fn q_total(&self) -> f64 {
        self.q_s + self.q_p
    }

    /// Pulmonary-to-systemic flow ratio Qp/Qs.
    pub fn flow_ratio(&self) -> f64 {
        self.q_p / self.q_s
    }
}

/// Inputs of the two-compartment oxygen balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OxygenParams {
    /// Hemoglobin concentration (g/dL)
    pub hemoglobin: f64,
    /// Total oxygen consumption CVO2 (mL O2/min)
    pub consumption: f64,
    /// Pulmonary venous saturation (fraction)
    pub s_pv: f64,
}

impl Default for OxygenParams {
    fn default() -> Self {
        Self {
            hemoglobin: 15.0,
            consumption: 150.0,
            s_pv: crate::DEFAULT_PULMONARY_VENOUS_SATURATION,
        }
    }
}

impl OxygenParams {
    /// Create parameters with the default pulmonary venous saturation.
    pub fn new(hemoglobin: f64, consumption: f64) -> Self {
        Self {
            hemoglobin,
            consumption,
            ..Self::default()
        }
    }

    /// Set the pulmonary venous saturation.
    pub fn with_pulmonary_venous_saturation(mut self, s_pv: f64) -> Self {
        self.s_pv = s_pv;
        self
    }

    /// Check every input, naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        require_all_positive(&[
            ("Hb", self.hemoglobin),
            ("CVO2", self.consumption),
            ("S_pv", self.s_pv),
        ])
    }
}

/// Mixed and systemic venous saturations with derived delivery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OxygenSolution {
    /// Mixed saturation S_m (fraction)
    pub s_m: f64,
    /// Systemic venous saturation S_sv (fraction)
    pub s_sv: f64,
    /// Systemic oxygen delivery D20 = 1.34·Hb·S_m·Q_s
    pub delivery: f64,
}

/// Shunted systemic/pulmonary circuit driven by aortic outflow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShuntCircuit {
    /// Systemic vascular resistance R_S (Wood units)
    pub r_s: f64,
    /// Pulmonary vascular resistance R_P (Wood units)
    pub r_p: f64,
    /// Blalock-Taussig shunt resistance R_BTS (Wood units)
    pub r_bts: f64,
    /// Systemic arterial compliance C_S (L/mmHg)
    pub c_s: f64,
    /// Pulmonary arterial compliance C_P (L/mmHg)
    pub c_p: f64,
}

impl ShuntCircuit {
    /// Check every input, naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        require_all_positive(&[
            ("R_s", self.r_s),
            ("R_p", self.r_p),
            ("R_BTS", self.r_bts),
            ("C_s", self.c_s),
            ("C_p", self.c_p),
        ])
    }
}

/// Instantaneous state of the shunted circuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShuntState {
    pub q_sa: f64,
    pub q_sv: f64,
    pub q_pa: f64,
    pub q_pv: f64,
    pub p_sa: f64,
    pub p_sv: f64,
    pub p_pa: f64,
    pub p_pv: f64,
}

impl ShuntState {
    /// Number of unknowns per time step.
    pub const SIZE: usize = 8;

    pub(crate) fn from_slice(x: &[f64]) -> Self {
        Self {
            q_sa: x[0],
            q_sv: x[1],
            q_pa: x[2],
            q_pv: x[3],
            p_sa: x[4],
            p_sv: x[5],
            p_pa: x[6],
            p_pv: x[7],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SteadyStateParams::default().validate().is_ok());
        assert!(OxygenParams::default().validate().is_ok());
    }

    #[test]
    fn test_validate_names_field() {
        let params = SteadyStateParams {
            r_p: 0.0,
            ..SteadyStateParams::default()
        };
        assert_eq!(params.validate().unwrap_err().param(), Some("R_p"));

        let params = SteadyStateParams {
            closure: StrokeVolumeClosure::EjectionFraction { ef: 1.2 },
            ..SteadyStateParams::default()
        };
        assert_eq!(params.validate().unwrap_err().param(), Some("EF"));
    }

    #[test]
    fn test_stroke_volume() {
        let params = SteadyStateParams::default();
        // 6 * 10 - 1.4 * 20
        assert!((params.stroke_volume(20.0, 10.0) - 32.0).abs() < 1e-12);

        let params = SteadyStateParams {
            closure: StrokeVolumeClosure::EjectionFraction { ef: 0.5 },
            ..params
        };
        assert!((params.stroke_volume(20.0, 10.0) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_closure_serde_tag() {
        let json = r#"{"kind":"ejection_fraction","ef":0.6}"#;
        let closure: StrokeVolumeClosure = serde_json::from_str(json).unwrap();
        assert_eq!(closure, StrokeVolumeClosure::EjectionFraction { ef: 0.6 });
    }
}
