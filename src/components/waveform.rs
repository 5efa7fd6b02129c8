//! Driving waveforms for the time-dependent simulators.
//!
//! The aortic outflow is a periodic triangular pulse: a linear rise from zero
//! to `Q_max` over `[0, T_max]`, a linear fall back to zero over
//! `[T_max, T_s]`, and no flow for the rest of the period.

use serde::{Deserialize, Serialize};

use crate::circuit::{require_non_negative, require_positive};
use crate::error::{NorwoodError, Result};

/// A scalar function of time driving a simulation.
pub trait Waveform {
    /// Value at time `t`.
    fn value(&self, t: f64) -> f64;
}

impl<F> Waveform for F
where
    F: Fn(f64) -> f64,
{
    fn value(&self, t: f64) -> f64 {
        self(t)
    }
}

/// Pulsatile triangular aortic outflow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AorticOutflow {
    /// Cycle length T (min)
    pub period: f64,
    /// End of the rise T_max (min)
    pub t_max: f64,
    /// End of ejection T_s (min)
    pub t_s: f64,
    /// Peak flow Q_max (L/min)
    pub q_max: f64,
}

impl Default for AorticOutflow {
    fn default() -> Self {
        Self {
            period: 0.0125,
            t_max: 0.005,
            t_s: 0.008,
            q_max: 5.0,
        }
    }
}

impl AorticOutflow {
    /// Create a waveform, checking `0 < T_max < T_s <= T` and `Q_max >= 0`.
    pub fn new(period: f64, t_max: f64, t_s: f64, q_max: f64) -> Result<Self> {
        let waveform = Self {
            period,
            t_max,
            t_s,
            q_max,
        };
        waveform.validate()?;
        Ok(waveform)
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("T", self.period)?;
        require_positive("T_max", self.t_max)?;
        require_non_negative("Q_max", self.q_max)?;
        if !(self.t_s > self.t_max) {
            return Err(NorwoodError::invalid_parameter(
                "T_s",
                self.t_s,
                format!("must exceed T_max ({})", self.t_max),
            ));
        }
        if self.t_s > self.period {
            return Err(NorwoodError::invalid_parameter(
                "T_s",
                self.t_s,
                format!("must not exceed the period ({})", self.period),
            ));
        }
        Ok(())
    }

    /// Mean flow over one cycle (area of the triangle over the period).
    pub fn mean_flow(&self) -> f64 {
        0.5 * self.q_max * self.t_s / self.period
    }
}

impl Waveform for AorticOutflow {
    fn value(&self, t: f64) -> f64 {
        let phase = t.rem_euclid(self.period);
        if phase <= self.t_max {
            self.q_max * phase / self.t_max
        } else if phase <= self.t_s {
            self.q_max * (self.t_s - phase) / (self.t_s - self.t_max)
        } else {
            0.0
        }
    }
}
