//! Elastance-driven 14-state simulator.
//!
//! Adds an atrium and a ventricle with time-varying elastance to the shunt
//! circuit. The atrium fills from the systemic and pulmonary veins, the
//! inlet valve passes blood to the ventricle, and the outlet valve ejects
//! into the systemic artery, which feeds the systemic bed and the shunt.
//!
//! Step n uses the state of step n−1 for the explicit parts (valve opening,
//! Bernoulli loss, chamber viscous damping) and solves for everything else
//! implicitly. Volumes and arterial pressures follow backward Euler. Because
//! the chamber volumes and arterial compliances exchange blood only with
//! each other, `V_a + V_v + C_SA·P_SA + C_PA·P_PA` is conserved from step to
//! step and the volume constraint then fixes the venous pressure.

use serde::{Deserialize, Serialize};

use super::matrix::CircuitMatrix;
use super::simulator::{step_count, TimeSeries, MAX_STEPS};
use crate::circuit::{require_all_positive, require_finite, require_non_negative, require_time_grid};
use crate::components::{Chamber, Elastance, HillActivation, Valve};
use crate::error::Result;

const P_A: usize = 0;
const P_V: usize = 1;
const Q_INT: usize = 2;
const Q_EXT: usize = 3;
const V_A: usize = 4;
const V_V: usize = 5;
const Q_SA: usize = 6;
const Q_SV: usize = 7;
const Q_PA: usize = 8;
const Q_PV: usize = 9;
const P_SA: usize = 10;
const P_SV: usize = 11;
const P_PA: usize = 12;
const P_PV: usize = 13;

/// State of the elastance-driven circuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedState {
    /// Atrial pressure
    pub p_a: f64,
    /// Ventricular pressure
    pub p_v: f64,
    /// Inlet (atrioventricular) valve flow
    pub q_int: f64,
    /// Outlet (ventriculo-arterial) valve flow
    pub q_ext: f64,
    /// Atrial volume
    pub v_a: f64,
    /// Ventricular volume
    pub v_v: f64,
    pub q_sa: f64,
    pub q_sv: f64,
    pub q_pa: f64,
    pub q_pv: f64,
    pub p_sa: f64,
    pub p_sv: f64,
    pub p_pa: f64,
    pub p_pv: f64,
}

impl ExtendedState {
    pub const SIZE: usize = 14;

    /// Build a state from the 14-vector (p_a, p_v, Q_int, Q_ext, V_a, V_v,
    /// Q_SA, Q_SV, Q_PA, Q_PV, P_SA, P_SV, P_PA, P_PV).
    pub fn from_slice(x: &[f64]) -> Self {
        Self {
            p_a: x[P_A],
            p_v: x[P_V],
            q_int: x[Q_INT],
            q_ext: x[Q_EXT],
            v_a: x[V_A],
            v_v: x[V_V],
            q_sa: x[Q_SA],
            q_sv: x[Q_SV],
            q_pa: x[Q_PA],
            q_pv: x[Q_PV],
            p_sa: x[P_SA],
            p_sv: x[P_SV],
            p_pa: x[P_PA],
            p_pv: x[P_PV],
        }
    }

    pub fn to_array(&self) -> [f64; Self::SIZE] {
        [
            self.p_a, self.p_v, self.q_int, self.q_ext, self.v_a, self.v_v, self.q_sa, self.q_sv,
            self.q_pa, self.q_pv, self.p_sa, self.p_sv, self.p_pa, self.p_pv,
        ]
    }

    /// Pressures and volumes must be non-negative.
    ///
    /// Flows only need to be finite. Valve flows reverse during
    /// regurgitation and the venous returns swing negative while the
    /// chamber fills, so a state captured mid-beat is a valid start.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("p_a", self.p_a),
            ("p_v", self.p_v),
            ("V_a", self.v_a),
            ("V_v", self.v_v),
            ("P_SA", self.p_sa),
            ("P_SV", self.p_sv),
            ("P_PA", self.p_pa),
            ("P_PV", self.p_pv),
        ] {
            require_non_negative(name, value)?;
        }
        for (name, value) in [
            ("Q_int", self.q_int),
            ("Q_ext", self.q_ext),
            ("Q_SA", self.q_sa),
            ("Q_SV", self.q_sv),
            ("Q_PA", self.q_pa),
            ("Q_PV", self.q_pv),
        ] {
            require_finite(name, value)?;
        }
        Ok(())
    }

    /// Resting initial state matching [`ExtendedModel::reference`].
    pub fn reference_initial() -> Self {
        Self::from_slice(&[
            5.0, 5.0, 0.0, 0.0, 0.01, 0.02, 0.0, 0.0, 0.0, 0.0, 60.0, 5.0, 20.0, 5.0,
        ])
    }

    /// Blood held by the chambers and the arterial compliances.
    pub fn exchanged_volume(&self, model: &ExtendedModel) -> f64 {
        self.v_a + self.v_v + model.c_sa * self.p_sa + model.c_pa * self.p_pa
    }
}

/// Parameters of the elastance-driven circuit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendedModel {
    pub atrium: Chamber,
    pub ventricle: Chamber,
    /// Atrioventricular valve
    pub inlet: Valve,
    /// Ventriculo-arterial valve
    pub outlet: Valve,
    pub r_s: f64,
    pub r_p: f64,
    pub r_bts: f64,
    pub c_sa: f64,
    pub c_pa: f64,
    pub c_sv: f64,
    pub c_pv: f64,
    pub v_total: f64,
}

impl ExtendedModel {
    /// Reference single-ventricle parameter set at `heart_rate`.
    pub fn reference(heart_rate: f64) -> Result<Self> {
        require_all_positive(&[("HR", heart_rate)])?;
        let period = 1.0 / heart_rate;
        let ventricle = Elastance::new(
            2.0,
            60.0,
            heart_rate,
            HillActivation {
                onset: 0.0,
                m1: 1.32,
                tau1: 0.269 * period,
                m2: 27.4,
                tau2: 0.452 * period,
            },
        )?;
        let atrium = Elastance::new(
            2.0,
            8.0,
            heart_rate,
            HillActivation {
                onset: 0.85 * period,
                m1: 1.32,
                tau1: 0.11 * period,
                m2: 13.1,
                tau2: 0.18 * period,
            },
        )?;
        let valve = Valve {
            inertance: 1e-5,
            bernoulli: 1e-3,
            resistance: 0.05,
            steepness: 5.0,
        };

        Ok(Self {
            atrium: Chamber::new(atrium, 0.005, 0.0005)?,
            ventricle: Chamber::new(ventricle, 0.01, 0.0005)?,
            inlet: valve,
            outlet: valve,
            r_s: 20.0,
            r_p: 2.0,
            r_bts: 15.0,
            c_sa: 0.0005,
            c_pa: 0.0003,
            c_sv: 0.01,
            c_pv: 0.002,
            v_total: 0.35,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.atrium.validate()?;
        self.ventricle.validate()?;
        self.inlet.validate("int")?;
        self.outlet.validate("ext")?;
        require_all_positive(&[
            ("R_s", self.r_s),
            ("R_p", self.r_p),
            ("R_BTS", self.r_bts),
            ("C_SA", self.c_sa),
            ("C_PA", self.c_pa),
            ("C_SV", self.c_sv),
            ("C_PV", self.c_pv),
            ("V_total", self.v_total),
        ])
    }

    /// Assemble the equations of the step ending at `t` from state `prev`.
    fn assemble(&self, m: &mut CircuitMatrix, prev: &ExtendedState, t: f64, dt: f64) {
        m.clear();

        self.atrium.stamp(m, 0, P_A, V_A, t, prev.p_a, prev.v_a, dt);
        self.ventricle.stamp(m, 1, P_V, V_V, t, prev.p_v, prev.v_v, dt);
        self.inlet.stamp(m, 2, Q_INT, P_A, P_V, prev.q_int, prev.p_a - prev.p_v, dt);
        self.outlet.stamp(m, 3, Q_EXT, P_V, P_SA, prev.q_ext, prev.p_v - prev.p_sa, dt);

        // Chamber volumes
        m.stamp_sum(4, &[(V_A, 1.0 / dt), (Q_INT, 1.0), (Q_SV, -1.0), (Q_PV, -1.0)], prev.v_a / dt);
        m.stamp_sum(5, &[(V_V, 1.0 / dt), (Q_INT, -1.0), (Q_EXT, 1.0)], prev.v_v / dt);

        m.stamp_resistance(6, Q_SA, self.r_s, P_SA, P_SV);
        m.stamp_resistance(7, Q_PA, self.r_p, P_PA, P_PV);
        m.stamp_resistance(8, Q_PA, self.r_bts, P_SA, P_PA);
        m.stamp_equal(9, P_PV, P_SV);
        m.stamp_sum(10, &[(Q_SA, 1.0), (Q_PA, 1.0), (Q_EXT, -1.0)], 0.0);
        m.stamp_compliance(11, P_SA, Q_SA, Q_SV, self.c_sa, dt, prev.p_sa);
        m.stamp_compliance(12, P_PA, Q_PA, Q_PV, self.c_pa, dt, prev.p_pa);
        m.stamp_sum(
            13,
            &[
                (V_A, 1.0),
                (V_V, 1.0),
                (P_SA, self.c_sa),
                (P_SV, self.c_sv),
                (P_PA, self.c_pa),
                (P_PV, self.c_pv),
            ],
            self.v_total,
        );
    }
}

/// Backward-Euler stepper for an [`ExtendedModel`].
#[derive(Debug, Clone)]
pub struct ExtendedSimulator {
    model: ExtendedModel,
    dt: f64,
    t0: f64,
    /// Steps taken so far
    steps: usize,
    state: ExtendedState,
    matrix: CircuitMatrix,
}

impl ExtendedSimulator {
    pub fn new(model: ExtendedModel, x0: ExtendedState, t0: f64, dt: f64) -> Result<Self> {
        model.validate()?;
        x0.validate()?;
        require_finite("t0", t0)?;
        require_all_positive(&[("dt", dt)])?;
        Ok(Self {
            model,
            dt,
            t0,
            steps: 0,
            state: x0,
            matrix: CircuitMatrix::new(ExtendedState::SIZE),
        })
    }

    /// Time of the current state, `t0 + n·dt` after n steps.
    pub fn time(&self) -> f64 {
        self.t0 + self.steps as f64 * self.dt
    }

    pub fn state(&self) -> &ExtendedState {
        &self.state
    }

    /// Advance by one step.
    pub fn step(&mut self) -> Result<ExtendedState> {
        let t = self.t0 + (self.steps + 1) as f64 * self.dt;
        self.model.assemble(&mut self.matrix, &self.state, t, self.dt);
        let fit = self.matrix.solve_least_squares()?;
        if !fit.is_full_rank(ExtendedState::SIZE) {
            log::warn!("Extended step at t={} solved with rank {}", t, fit.rank);
        }
        self.state = ExtendedState::from_slice(&fit.x);
        self.steps += 1;
        Ok(self.state)
    }

    /// Record the current state, then take `steps` steps.
    pub fn run(&mut self, steps: usize) -> Result<TimeSeries<ExtendedState>> {
        let mut series = TimeSeries::with_capacity(steps.min(MAX_STEPS) + 1);
        series.push(self.time(), self.state);
        for _ in 0..steps {
            let state = self.step()?;
            series.push(self.time(), state);
        }
        Ok(series)
    }
}

/// Simulate from `x0` at `t0` to `tf`: x0 plus ceil((tf − t0)/dt) steps.
pub fn simulate_extended(
    model: &ExtendedModel,
    x0: ExtendedState,
    t0: f64,
    tf: f64,
    dt: f64,
) -> Result<TimeSeries<ExtendedState>> {
    require_finite("t0", t0)?;
    require_time_grid("tf - t0", tf - t0, dt)?;
    let steps = step_count(tf - t0, dt)?;
    log::debug!("Extended simulation: {} steps of {}", steps, dt);
    ExtendedSimulator::new(*model, x0, t0, dt)?.run(steps)
}
