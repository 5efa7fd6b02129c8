//! One-at-a-time sweeps of the steady-state and oxygen inputs.
//!
//! Each sweep scales a single input by 0.50, 0.55, ... 1.50 while every
//! other input stays at its baseline, then solves flow/pressure followed by
//! the oxygen balance.

use serde::{Deserialize, Serialize};

use crate::circuit::{
    OxygenParams, OxygenSolution, SteadyStateParams, SteadyStateSolution, StrokeVolumeClosure,
};
use crate::error::{NorwoodError, Result};
use crate::solver::{solve_flow_pressure, solve_saturation};

/// Number of points in every sweep.
pub const SWEEP_STEPS: usize = 21;

/// Scale factors 0.50..=1.50 in steps of 0.05.
///
/// Computed as (50 + 5i)/100 so that the midpoint is exactly 1.0.
pub fn sweep_factors() -> Vec<f64> {
    (0..SWEEP_STEPS).map(|i| (50 + 5 * i) as f64 / 100.0).collect()
}

/// Input varied by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SweepParameter {
    SystolicCompliance,
    DiastolicCompliance,
    ArterialCompliance,
    VenousCompliance,
    HeartRate,
    SystemicResistance,
    PulmonaryResistance,
    TotalVolume,
    Hemoglobin,
    Consumption,
}

impl SweepParameter {
    pub const ALL: [SweepParameter; 10] = [
        Self::SystolicCompliance,
        Self::DiastolicCompliance,
        Self::ArterialCompliance,
        Self::VenousCompliance,
        Self::HeartRate,
        Self::SystemicResistance,
        Self::PulmonaryResistance,
        Self::TotalVolume,
        Self::Hemoglobin,
        Self::Consumption,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::SystolicCompliance => "C_sys",
            Self::DiastolicCompliance => "C_dia",
            Self::ArterialCompliance => "C_A",
            Self::VenousCompliance => "C_V",
            Self::HeartRate => "HR",
            Self::SystemicResistance => "R_s",
            Self::PulmonaryResistance => "R_p",
            Self::TotalVolume => "V_total",
            Self::Hemoglobin => "Hb",
            Self::Consumption => "CVO2",
        }
    }

    /// Parse a label as printed by [`label`](Self::label), ignoring case.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s))
    }

    /// Scale this input in place, returning its new value.
    fn scale(&self, steady: &mut SteadyStateParams, oxygen: &mut OxygenParams, factor: f64) -> Result<f64> {
        let field = match self {
            Self::SystolicCompliance => match &mut steady.closure {
                StrokeVolumeClosure::Compliance { c_sys } => c_sys,
                StrokeVolumeClosure::EjectionFraction { ef } => {
                    return Err(NorwoodError::invalid_parameter(
                        "C_sys",
                        *ef,
                        "cannot sweep C_sys under the ejection-fraction closure",
                    ))
                }
            },
            Self::DiastolicCompliance => &mut steady.c_dia,
            Self::ArterialCompliance => &mut steady.c_a,
            Self::VenousCompliance => &mut steady.c_v,
            Self::HeartRate => &mut steady.heart_rate,
            Self::SystemicResistance => &mut steady.r_s,
            Self::PulmonaryResistance => &mut steady.r_p,
            Self::TotalVolume => &mut steady.v_total,
            Self::Hemoglobin => &mut oxygen.hemoglobin,
            Self::Consumption => &mut oxygen.consumption,
        };
        *field *= factor;
        Ok(*field)
    }
}

/// One evaluated point of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub factor: f64,
    /// Value of the swept input at this point
    pub value: f64,
    pub flow: SteadyStateSolution,
    pub oxygen: OxygenSolution,
}

fn evaluate(steady: &SteadyStateParams, oxygen: &OxygenParams) -> Result<(SteadyStateSolution, OxygenSolution)> {
    let flow = solve_flow_pressure(steady)?;
    let saturation = solve_saturation(flow.q_s, flow.q_p, oxygen)?;
    Ok((flow, saturation))
}

/// Sweep `parameter` around the given baseline.
pub fn sweep(
    parameter: SweepParameter,
    steady: &SteadyStateParams,
    oxygen: &OxygenParams,
) -> Result<Vec<SweepPoint>> {
    log::debug!("Sweeping {}", parameter.label());
    sweep_factors()
        .into_iter()
        .map(|factor| {
            let (mut s, mut o) = (*steady, *oxygen);
            let value = parameter.scale(&mut s, &mut o, factor)?;
            let (flow, oxygen) = evaluate(&s, &o)?;
            Ok(SweepPoint {
                factor,
                value,
                flow,
                oxygen,
            })
        })
        .collect()
}

/// Sweep every input that applies to the baseline's closure.
///
/// `C_sys` is skipped under the ejection-fraction closure.
pub fn sweep_all(
    steady: &SteadyStateParams,
    oxygen: &OxygenParams,
) -> Result<Vec<(SweepParameter, Vec<SweepPoint>)>> {
    let has_c_sys = matches!(steady.closure, StrokeVolumeClosure::Compliance { .. });
    let parameters: Vec<_> = SweepParameter::ALL
        .into_iter()
        .filter(|p| has_c_sys || *p != SweepParameter::SystolicCompliance)
        .collect();
    log::info!("Running {} sweeps of {} points", parameters.len(), SWEEP_STEPS);
    parameters
        .into_iter()
        .map(|p| Ok((p, sweep(p, steady, oxygen)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_factors() {
        let f = sweep_factors();
        assert_eq!(f.len(), SWEEP_STEPS);
        assert_eq!(f[0], 0.5);
        assert_eq!(f[10], 1.0);
        assert_eq!(f[20], 1.5);
    }

    #[test]
    fn test_midpoint_reproduces_baseline() {
        let steady = SteadyStateParams::default();
        let oxygen = OxygenParams::default();
        let (flow, sat) = evaluate(&steady, &oxygen).unwrap();
        for (parameter, points) in sweep_all(&steady, &oxygen).unwrap() {
            assert_eq!(points.len(), SWEEP_STEPS);
            assert_eq!(points[10].flow, flow, "{}", parameter.label());
            assert_eq!(points[10].oxygen, sat, "{}", parameter.label());
        }
    }

    #[test]
    fn test_volume_sweep_is_linear() {
        let steady = SteadyStateParams::default();
        let points = sweep(SweepParameter::TotalVolume, &steady, &OxygenParams::default()).unwrap();
        let base = points[10].flow;
        for p in &points {
            assert_relative_eq!(p.value, 420.0 * p.factor, max_relative = 1e-12);
            assert_relative_eq!(p.flow.q_s, base.q_s * p.factor, max_relative = 1e-9);
            assert_relative_eq!(p.flow.p_a, base.p_a * p.factor, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_pulmonary_resistance_sets_flow_ratio() {
        let steady = SteadyStateParams::default();
        let points = sweep(SweepParameter::PulmonaryResistance, &steady, &OxygenParams::default()).unwrap();
        for p in &points {
            assert_relative_eq!(p.flow.flow_ratio(), steady.r_s / p.value, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_oxygen_sweep_keeps_flows() {
        let steady = SteadyStateParams::default();
        let points = sweep(SweepParameter::Hemoglobin, &steady, &OxygenParams::default()).unwrap();
        for w in points.windows(2) {
            assert_eq!(w[0].flow, w[1].flow);
            // More hemoglobin, less desaturation for the same consumption
            assert!(w[1].oxygen.s_sv > w[0].oxygen.s_sv);
        }
    }

    #[test]
    fn test_ejection_fraction_closure() {
        let steady = SteadyStateParams {
            closure: StrokeVolumeClosure::EjectionFraction { ef: 0.5 },
            ..SteadyStateParams::default()
        };
        let oxygen = OxygenParams::default();
        let err = sweep(SweepParameter::SystolicCompliance, &steady, &oxygen).unwrap_err();
        assert_eq!(err.param(), Some("C_sys"));

        let all = sweep_all(&steady, &oxygen).unwrap();
        assert_eq!(all.len(), SweepParameter::ALL.len() - 1);
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(SweepParameter::from_str("r_p"), Some(SweepParameter::PulmonaryResistance));
        assert_eq!(SweepParameter::from_str("CVO2"), Some(SweepParameter::Consumption));
        assert_eq!(SweepParameter::from_str("nope"), None);
    }
}
