//! Multi-compartment circuit: upper body, lower body, pulmonary and
//! venoatrial compartments.
//!
//! Compliances here are normalized by total blood volume, so the volume
//! constraint reads `1 = C_sa·P_sa + C_pv·P_pv + C_pa·P_pa`.

use serde::{Deserialize, Serialize};

use super::validate::{require_all_positive, require_fraction};
use crate::error::Result;

/// Volume-normalized compliances of the compartment model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompartmentCompliances {
    /// Diastolic ventricular compliance C_d
    pub c_d: f64,
    /// Systolic ventricular compliance C_s
    pub c_s: f64,
    /// Systemic arterial compliance C_sa
    pub c_sa: f64,
    /// Pulmonary venous compliance C_pv
    pub c_pv: f64,
    /// Pulmonary arterial compliance C_pa
    pub c_pa: f64,
}

impl Default for CompartmentCompliances {
    /// Calibrated baseline.
    fn default() -> Self {
        Self {
            c_d: 2.26285145,
            c_s: 0.16040435,
            c_sa: 0.01,
            c_pv: 0.06301968,
            c_pa: 0.01,
        }
    }
}

impl CompartmentCompliances {
    pub fn validate(&self) -> Result<()> {
        require_all_positive(&[
            ("C_d", self.c_d),
            ("C_s", self.c_s),
            ("C_sa", self.c_sa),
            ("C_pv", self.c_pv),
            ("C_pa", self.c_pa),
        ])
    }
}

/// Hemodynamic inputs of the compartment flow/pressure system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompartmentParams {
    /// Upper-body vascular resistance (Wood units)
    pub uvr: f64,
    /// Lower-body vascular resistance (Wood units)
    pub lvr: f64,
    /// Pulmonary vascular resistance (Wood units)
    pub pvr: f64,
    /// Heart rate (beats/min)
    pub heart_rate: f64,
    pub compliances: CompartmentCompliances,
}

impl Default for CompartmentParams {
    fn default() -> Self {
        Self {
            uvr: 45.0,
            lvr: 35.0,
            pvr: 10.0,
            heart_rate: 114.0,
            compliances: CompartmentCompliances::default(),
        }
    }
}

impl CompartmentParams {
    pub fn validate(&self) -> Result<()> {
        require_all_positive(&[
            ("UVR", self.uvr),
            ("LVR", self.lvr),
            ("PVR", self.pvr),
            ("HR", self.heart_rate),
        ])?;
        self.compliances.validate()
    }

    /// Parallel combination of the upper and lower body resistances.
    pub fn systemic_resistance(&self) -> f64 {
        1.0 / (1.0 / self.uvr + 1.0 / self.lvr)
    }

    /// Systemic resistance expressed on the clinical scale.
    pub fn clinical_svr(&self) -> f64 {
        self.systemic_resistance() * CLINICAL_SVR_SCALE
    }

    /// Pulmonary resistance expressed on the clinical scale.
    pub fn clinical_pvr(&self) -> f64 {
        self.pvr * CLINICAL_PVR_SCALE
    }

    /// Return a copy with resistances scaled by `effect`.
    pub fn with_drug(&self, effect: DrugEffect) -> Self {
        let m = effect.multipliers();
        self.with_multipliers(m)
    }

    /// Return a copy with explicit resistance multipliers applied.
    pub fn with_multipliers(&self, m: ResistanceMultipliers) -> Self {
        Self {
            uvr: self.uvr * m.svr,
            lvr: self.lvr * m.svr,
            pvr: self.pvr * m.pvr,
            ..*self
        }
    }
}

/// Model-to-clinical scale for systemic resistance (17.1 / 19.6).
pub const CLINICAL_SVR_SCALE: f64 = 17.1 / 19.6;

/// Model-to-clinical scale for pulmonary resistance (1.8 / 10).
pub const CLINICAL_PVR_SCALE: f64 = 1.8 / 10.0;

/// Multipliers applied to the systemic (UVR, LVR) and pulmonary resistances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResistanceMultipliers {
    pub svr: f64,
    pub pvr: f64,
}

impl ResistanceMultipliers {
    pub const IDENTITY: Self = Self { svr: 1.0, pvr: 1.0 };
}

/// Vasoactive drug applied as a parameter transform before solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrugEffect {
    #[default]
    Baseline,
    Vasopressin,
    Phenylephrine,
}

impl DrugEffect {
    /// Nominal resistance multipliers.
    pub fn multipliers(&self) -> ResistanceMultipliers {
        match self {
            DrugEffect::Baseline => ResistanceMultipliers::IDENTITY,
            DrugEffect::Vasopressin => ResistanceMultipliers {
                svr: 1.0 + 0.28,
                pvr: 1.0 - 0.222,
            },
            DrugEffect::Phenylephrine => ResistanceMultipliers {
                svr: 1.0 + 0.287,
                pvr: 1.0 + 0.287,
            },
        }
    }

    /// Parse a drug name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "baseline" | "none" => Some(Self::Baseline),
            "vasopressin" | "vaso" => Some(Self::Vasopressin),
            "phenylephrine" | "phe" => Some(Self::Phenylephrine),
            _ => None,
        }
    }
}

/// Oxygen inputs of the compartment saturation system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompartmentOxygenParams {
    /// Systemic arterial saturation (fraction)
    pub s_sa: f64,
    /// Hemoglobin (g/dL)
    pub hemoglobin: f64,
    /// Upper-body oxygen consumption (mL O2/min)
    pub cvo2_upper: f64,
    /// Lower-body oxygen consumption (mL O2/min)
    pub cvo2_lower: f64,
}

impl Default for CompartmentOxygenParams {
    fn default() -> Self {
        Self {
            s_sa: 0.99,
            hemoglobin: 15.0,
            cvo2_upper: 50.0,
            cvo2_lower: 40.0,
        }
    }
}

impl CompartmentOxygenParams {
    pub fn validate(&self) -> Result<()> {
        require_fraction("S_sa", self.s_sa)?;
        require_all_positive(&[
            ("Hb", self.hemoglobin),
            ("CVO2u", self.cvo2_upper),
            ("CVO2l", self.cvo2_lower),
        ])
    }
}

/// Solution of the compartment flow/pressure system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompartmentFlows {
    /// Venous return Q_v
    pub q_v: f64,
    /// Upper-body flow Q_u
    pub q_u: f64,
    /// Lower-body flow Q_l
    pub q_l: f64,
    /// Pulmonary flow Q_p
    pub q_p: f64,
    /// Systemic arterial pressure P_sa
    pub p_sa: f64,
    /// Pulmonary arterial pressure P_pa
    pub p_pa: f64,
    /// Pulmonary venous pressure P_pv
    pub p_pv: f64,
}

impl CompartmentFlows {
    pub const SIZE: usize = 7;

    pub(crate) fn from_slice(x: &[f64]) -> Self {
        debug_assert_eq!(x.len(), Self::SIZE);
        Self {
            q_v: x[0],
            q_u: x[1],
            q_l: x[2],
            q_p: x[3],
            p_sa: x[4],
            p_pa: x[5],
            p_pv: x[6],
        }
    }

    /// Unknowns in solver order.
    pub fn to_array(&self) -> [f64; Self::SIZE] {
        [
            self.q_v, self.q_u, self.q_l, self.q_p, self.p_sa, self.p_pa, self.p_pv,
        ]
    }

    /// Transpulmonary gradient P_pa − P_pv.
    pub fn transpulmonary_gradient(&self) -> f64 {
        self.p_pa - self.p_pv
    }
}

impl Default for CompartmentFlows {
    /// Initial guess for the root-finder.
    fn default() -> Self {
        Self::from_slice(&[3.1, 1.5, 1.5, 3.2, 75.0, 26.0, 2.0])
    }
}

/// Solution of the compartment saturation system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompartmentSaturations {
    /// Pulmonary arterial saturation S_pa
    pub s_pa: f64,
    /// Pulmonary venous saturation S_pv
    pub s_pv: f64,
    /// Upper-body venous saturation S_svu
    pub s_svu: f64,
    /// Lower-body venous saturation S_svl
    pub s_svl: f64,
}

impl CompartmentSaturations {
    pub const SIZE: usize = 4;

    pub(crate) fn from_slice(x: &[f64]) -> Self {
        debug_assert_eq!(x.len(), Self::SIZE);
        Self {
            s_pa: x[0],
            s_pv: x[1],
            s_svu: x[2],
            s_svl: x[3],
        }
    }

    pub fn to_array(&self) -> [f64; Self::SIZE] {
        [self.s_pa, self.s_pv, self.s_svu, self.s_svl]
    }

    /// Oxygen extraction ratio
    /// `(Q_u(S_sa − S_svu) + Q_l(S_sa − S_svl)) / ((Q_u + Q_l)·S_sa)`.
    pub fn extraction_ratio(&self, flows: &CompartmentFlows, s_sa: f64) -> f64 {
        let extracted = flows.q_u * (s_sa - self.s_svu) + flows.q_l * (s_sa - self.s_svl);
        extracted / ((flows.q_u + flows.q_l) * s_sa)
    }
}

impl Default for CompartmentSaturations {
    /// Initial guess for the root-finder.
    fn default() -> Self {
        Self::from_slice(&[0.55, 0.99, 0.55, 0.55])
    }
}
