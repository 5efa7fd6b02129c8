//! Compliance estimation from pressure/flow samples.
//!
//! Both estimators are single least-squares fits with one unknown. They do
//! not fail on collinear or degenerate samples: the fit rank and residual are
//! returned for the caller to judge.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::matrix::least_squares;
use crate::circuit::require_positive;
use crate::error::{NorwoodError, Result};

/// Empirical ratio C_V / C_A.
pub const VENOUS_TO_ARTERIAL_RATIO: f64 = 7.0;

/// Arterial and venous compliance estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArterialVenousEstimate {
    pub c_a: f64,
    pub c_v: f64,
    /// Residual norm of the fit
    pub residual: f64,
    /// Rank of the design column (0 or 1)
    pub rank: usize,
}

/// Diastolic compliance estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiastolicEstimate {
    pub c_dia: f64,
    pub residual: f64,
    pub rank: usize,
}

fn check_lengths(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(NorwoodError::dimension_mismatch(what, expected, actual));
    }
    Ok(())
}

fn fit_single(column: Vec<f64>, rhs: Vec<f64>) -> Result<(f64, f64, usize)> {
    let n = column.len();
    let a = DMatrix::from_vec(n, 1, column);
    let b = DVector::from_vec(rhs);
    let fit = least_squares(a, &b)?;
    Ok((fit.x[0], fit.residual, fit.rank))
}

/// Estimate C_A and C_V from paired arterial/venous pressures.
///
/// Fits `C_A·(P_a + 7·P_v) = V_total` over all samples with `C_V = 7·C_A`.
/// Without a known total volume the right-hand side is 1 and the result is
/// a compliance-to-volume ratio.
pub fn estimate_arterial_venous(
    p_a: &[f64],
    p_v: &[f64],
    v_total: Option<f64>,
) -> Result<ArterialVenousEstimate> {
    if p_a.is_empty() {
        return Err(NorwoodError::dimension_mismatch("arterial pressure samples", 1, 0));
    }
    check_lengths("venous pressure samples", p_a.len(), p_v.len())?;
    let volume = match v_total {
        Some(v) => {
            require_positive("V_total", v)?;
            v
        }
        None => 1.0,
    };

    let column = p_a
        .iter()
        .zip(p_v)
        .map(|(a, v)| a + VENOUS_TO_ARTERIAL_RATIO * v)
        .collect();
    let (c_a, residual, rank) = fit_single(column, vec![volume; p_a.len()])?;

    log::debug!(
        "Arterial/venous fit over {} samples: C_A={} residual={:.3e}",
        p_a.len(),
        c_a,
        residual
    );
    Ok(ArterialVenousEstimate {
        c_a,
        c_v: VENOUS_TO_ARTERIAL_RATIO * c_a,
        residual,
        rank,
    })
}

/// Estimate C_dia from `Q_s + Q_p = HR·EF·P_v·C_dia` over all samples.
pub fn estimate_diastolic(
    p_v: &[f64],
    heart_rate: &[f64],
    ef: &[f64],
    q_s: &[f64],
    q_p: &[f64],
) -> Result<DiastolicEstimate> {
    let n = p_v.len();
    if n == 0 {
        return Err(NorwoodError::dimension_mismatch("venous pressure samples", 1, 0));
    }
    check_lengths("heart rate samples", n, heart_rate.len())?;
    check_lengths("ejection fraction samples", n, ef.len())?;
    check_lengths("systemic flow samples", n, q_s.len())?;
    check_lengths("pulmonary flow samples", n, q_p.len())?;

    let column = (0..n).map(|i| heart_rate[i] * ef[i] * p_v[i]).collect();
    let rhs = q_s.iter().zip(q_p).map(|(s, p)| s + p).collect();
    let (c_dia, residual, rank) = fit_single(column, rhs)?;

    log::debug!("Diastolic fit over {} samples: C_dia={} residual={:.3e}", n, c_dia, residual);
    Ok(DiastolicEstimate {
        c_dia,
        residual,
        rank,
    })
}
