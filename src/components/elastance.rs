//! Time-varying chamber elastance.
//!
//! Activation follows a double-Hill shape over one cardiac cycle:
//!
//! ```text
//! g_i(t) = (((t − t_onset) mod T) / τ_i)^m_i
//! s(t)   = g_1/(1 + g_1) · 1/(1 + g_2)
//! E(t)   = E_min + (E_max − E_min)·s(t)/k
//! ```
//!
//! `k` is the peak of `s` over one period, found by sampling, so that
//! `E` spans `[E_min, E_max]`.

use serde::{Deserialize, Serialize};

use crate::circuit::{require_all_positive, require_finite, require_non_negative};
use crate::error::{NorwoodError, Result};

/// Samples per period used to locate the activation peak.
pub const NORMALIZATION_SAMPLES: usize = 2000;

/// Double-Hill activation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HillActivation {
    /// Onset of contraction within the cycle (min)
    pub onset: f64,
    /// Contraction exponent m_1
    pub m1: f64,
    /// Contraction time constant τ_1 (min)
    pub tau1: f64,
    /// Relaxation exponent m_2
    pub m2: f64,
    /// Relaxation time constant τ_2 (min)
    pub tau2: f64,
}

impl HillActivation {
    pub fn validate(&self) -> Result<()> {
        require_finite("t_onset", self.onset)?;
        require_all_positive(&[
            ("m_1", self.m1),
            ("tau_1", self.tau1),
            ("m_2", self.m2),
            ("tau_2", self.tau2),
        ])
    }

    /// Unnormalized shape s at phase `phase` (time since onset, in [0, T)).
    fn shape(&self, phase: f64) -> f64 {
        let g1 = (phase / self.tau1).powf(self.m1);
        let g2 = (phase / self.tau2).powf(self.m2);
        g1 / (1.0 + g1) / (1.0 + g2)
    }
}

/// Periodic elastance curve E(t) of one chamber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elastance {
    pub e_min: f64,
    pub e_max: f64,
    /// Cycle length T = 1/HR (min)
    pub period: f64,
    pub activation: HillActivation,
    /// Peak of the unnormalized shape
    peak: f64,
}

impl Elastance {
    /// Build the curve for heart rate `heart_rate` (beats/min).
    pub fn new(e_min: f64, e_max: f64, heart_rate: f64, activation: HillActivation) -> Result<Self> {
        require_non_negative("E_min", e_min)?;
        require_finite("E_max", e_max)?;
        if e_max < e_min {
            return Err(NorwoodError::invalid_parameter(
                "E_max",
                e_max,
                format!("must be at least E_min ({e_min})"),
            ));
        }
        require_all_positive(&[("HR", heart_rate)])?;
        activation.validate()?;

        let period = 1.0 / heart_rate;
        let step = period / NORMALIZATION_SAMPLES as f64;
        let peak = (0..NORMALIZATION_SAMPLES)
            .map(|i| activation.shape(i as f64 * step))
            .fold(0.0, f64::max);
        if !(peak > 0.0) {
            return Err(NorwoodError::invalid_parameter(
                "tau_1",
                activation.tau1,
                "activation never rises within one cycle",
            ));
        }

        Ok(Self {
            e_min,
            e_max,
            period,
            activation,
            peak,
        })
    }

    /// Normalized activation s(t)/k.
    pub fn activation_at(&self, t: f64) -> f64 {
        let phase = (t - self.activation.onset).rem_euclid(self.period);
        self.activation.shape(phase) / self.peak
    }

    /// Elastance at time `t`.
    pub fn at(&self, t: f64) -> f64 {
        self.e_min + (self.e_max - self.e_min) * self.activation_at(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const HR: f64 = 130.0;

    fn ventricle() -> Elastance {
        let period = 1.0 / HR;
        Elastance::new(
            2.0,
            60.0,
            HR,
            HillActivation {
                onset: 0.0,
                m1: 1.32,
                tau1: 0.269 * period,
                m2: 27.4,
                tau2: 0.452 * period,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_elastance_spans_min_to_max() {
        let e = ventricle();
        let samples: Vec<f64> = (0..5000).map(|i| e.at(i as f64 * e.period / 5000.0)).collect();
        let max = samples.iter().cloned().fold(f64::MIN, f64::max);
        let min = samples.iter().cloned().fold(f64::MAX, f64::min);
        assert_relative_eq!(max, 60.0, max_relative = 1e-3);
        assert!(max <= 60.0 + 1e-2);
        assert!(min >= 2.0);
        assert_relative_eq!(min, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_elastance_is_periodic() {
        let e = ventricle();
        for &t in &[0.0005, 0.002, 0.005] {
            assert_relative_eq!(e.at(t), e.at(t + 2.0 * e.period), max_relative = 1e-9);
        }
    }

    #[test]
    fn test_onset_shifts_curve() {
        let base = ventricle();
        let shifted_activation = HillActivation {
            onset: 0.001,
            ..base.activation
        };
        let shifted = Elastance::new(2.0, 60.0, HR, shifted_activation).unwrap();
        assert_relative_eq!(shifted.at(0.003), base.at(0.002), max_relative = 1e-9);
    }

    #[test]
    fn test_invalid_elastance() {
        let act = ventricle().activation;
        assert_eq!(Elastance::new(5.0, 1.0, HR, act).unwrap_err().param(), Some("E_max"));
        assert_eq!(Elastance::new(1.0, 5.0, 0.0, act).unwrap_err().param(), Some("HR"));
        let bad = HillActivation { tau2: 0.0, ..act };
        assert_eq!(Elastance::new(1.0, 5.0, HR, bad).unwrap_err().param(), Some("tau_2"));
    }
}
