//! Time-dependent shunt simulator.
//!
//! Advances the eight-unknown systemic/pulmonary/shunt circuit with
//! backward Euler. Each step re-assembles the circuit matrix with the
//! previous arterial pressures as forcing and solves it by least squares.

use serde::{Deserialize, Serialize};

use super::matrix::CircuitMatrix;
use crate::circuit::{require_non_negative, require_positive, require_time_grid, ShuntCircuit, ShuntState};
use crate::components::Waveform;
use crate::error::{NorwoodError, Result};

const Q_SA: usize = 0;
const Q_SV: usize = 1;
const Q_PA: usize = 2;
const Q_PV: usize = 3;
const P_SA: usize = 4;
const P_SV: usize = 5;
const P_PA: usize = 6;
const P_PV: usize = 7;

/// Ordered (t, state) samples on a fixed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries<S> {
    pub times: Vec<f64>,
    pub states: Vec<S>,
}

impl<S> TimeSeries<S> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            times: Vec::with_capacity(capacity),
            states: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, t: f64, state: S) {
        self.times.push(t);
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Extract one quantity as its own series.
    pub fn column(&self, f: impl Fn(&S) -> f64) -> Vec<f64> {
        self.states.iter().map(f).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &S)> {
        self.times.iter().copied().zip(self.states.iter())
    }

    pub fn last(&self) -> Option<(f64, &S)> {
        Some((*self.times.last()?, self.states.last()?))
    }
}

/// Largest number of steps a single simulation may take.
pub const MAX_STEPS: usize = 10_000_000;

/// Number of steps of size `dt` needed to cover `span`, i.e. ceil(span/dt).
///
/// A ratio within a few ulps of an integer counts as that integer, so
/// `span = 0.3, dt = 0.1` gives 3 rather than 4. More than [`MAX_STEPS`]
/// steps is an error on `dt`.
pub(crate) fn step_count(span: f64, dt: f64) -> Result<usize> {
    let ratio = (span / dt) * (1.0 - 16.0 * f64::EPSILON);
    if !(ratio <= MAX_STEPS as f64) {
        return Err(NorwoodError::invalid_parameter(
            "dt",
            dt,
            format!("covering {} would take more than {} steps", span, MAX_STEPS),
        ));
    }
    Ok(ratio.ceil().max(1.0) as usize)
}

/// Backward-Euler stepper for a [`ShuntCircuit`].
#[derive(Debug, Clone)]
pub struct ShuntSimulator {
    circuit: ShuntCircuit,
    dt: f64,
    matrix: CircuitMatrix,
    /// Arterial pressures of the last step
    p_sa: f64,
    p_pa: f64,
}

impl ShuntSimulator {
    /// Create a simulator starting from the given arterial pressures.
    pub fn new(circuit: ShuntCircuit, p_sa0: f64, p_pa0: f64, dt: f64) -> Result<Self> {
        circuit.validate()?;
        require_non_negative("P_sa0", p_sa0)?;
        require_non_negative("P_pa0", p_pa0)?;
        require_positive("dt", dt)?;

        Ok(Self {
            circuit,
            dt,
            matrix: CircuitMatrix::new(ShuntState::SIZE),
            p_sa: p_sa0,
            p_pa: p_pa0,
        })
    }

    pub fn circuit(&self) -> &ShuntCircuit {
        &self.circuit
    }

    /// Assemble the step equations for driving flow `q_ao`.
    fn assemble(&mut self, q_ao: f64) {
        let c = self.circuit;
        let dt = self.dt;
        let m = &mut self.matrix;
        m.clear();

        m.stamp_resistance(0, Q_SA, c.r_s, P_SA, P_SV);
        m.stamp_resistance(1, Q_PA, c.r_p, P_PA, P_PV);
        m.stamp_resistance(2, Q_PA, c.r_bts, P_SA, P_PA);
        m.stamp_equal(3, P_PV, P_SV);
        m.stamp_sum(4, &[(Q_SA, 1.0), (Q_PA, 1.0)], q_ao);
        m.stamp_sum(5, &[(Q_SV, 1.0), (Q_PV, 1.0)], q_ao);
        m.stamp_compliance(6, P_SA, Q_SA, Q_SV, c.c_s, dt, self.p_sa);
        m.stamp_compliance(7, P_PA, Q_PA, Q_PV, c.c_p, dt, self.p_pa);
    }

    /// Advance one step at time `t` with aortic outflow `q_ao`.
    pub fn step(&mut self, t: f64, q_ao: f64) -> Result<ShuntState> {
        if !q_ao.is_finite() {
            return Err(NorwoodError::InvalidWaveform { time: t, value: q_ao });
        }
        self.assemble(q_ao);
        let fit = self.matrix.solve_least_squares()?;
        if !fit.is_full_rank(ShuntState::SIZE) {
            log::warn!("Shunt step at t={} solved with rank {}", t, fit.rank);
        }

        let state = ShuntState::from_slice(&fit.x);
        self.p_sa = state.p_sa;
        self.p_pa = state.p_pa;
        Ok(state)
    }

    /// Step through `t_i = i·dt` for `i` in `0..ceil(t_end/dt)`.
    pub fn run<W: Waveform + ?Sized>(&mut self, inflow: &W, t_end: f64) -> Result<TimeSeries<ShuntState>> {
        require_time_grid("t_end", t_end, self.dt)?;
        let steps = step_count(t_end, self.dt)?;
        log::debug!("Shunt simulation: {} steps of {}", steps, self.dt);

        let mut series = TimeSeries::with_capacity(steps);
        for i in 0..steps {
            let t = i as f64 * self.dt;
            let state = self.step(t, inflow.value(t))?;
            series.push(t, state);
        }
        Ok(series)
    }
}

/// Simulate the shunted circuit from `t = 0` to `t_end`.
///
/// All inputs are checked before the first step.
pub fn simulate_shunt<W: Waveform + ?Sized>(
    circuit: &ShuntCircuit,
    p_sa0: f64,
    p_pa0: f64,
    inflow: &W,
    t_end: f64,
    dt: f64,
) -> Result<TimeSeries<ShuntState>> {
    require_time_grid("t_end", t_end, dt)?;
    let mut sim = ShuntSimulator::new(*circuit, p_sa0, p_pa0, dt)?;
    sim.run(inflow, t_end)
}
