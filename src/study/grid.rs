//! Two-input grid over the compartment model.
//!
//! Both inputs span ±50% of their baseline value on `n` evenly spaced
//! points. A cell whose solve does not converge, or hits a singular
//! Jacobian, holds `None`. Every other error is returned, including an
//! axis value that leaves the valid range of its input.

use serde::{Deserialize, Serialize};

use crate::circuit::{CompartmentOxygenParams, CompartmentParams};
use crate::error::{NorwoodError, Result};
use crate::solver::{solve_compartment, CompartmentSolution, NewtonRaphson};

/// Compartment model input that a grid axis can vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompartmentInput {
    HeartRate,
    Uvr,
    Lvr,
    Pvr,
    ArterialSaturation,
    Hemoglobin,
    UpperConsumption,
    LowerConsumption,
    DiastolicCompliance,
    SystolicCompliance,
    ArterialCompliance,
    PulmonaryVenousCompliance,
    PulmonaryArterialCompliance,
}

impl CompartmentInput {
    pub const ALL: [CompartmentInput; 13] = [
        Self::HeartRate,
        Self::Uvr,
        Self::Lvr,
        Self::Pvr,
        Self::ArterialSaturation,
        Self::Hemoglobin,
        Self::UpperConsumption,
        Self::LowerConsumption,
        Self::DiastolicCompliance,
        Self::SystolicCompliance,
        Self::ArterialCompliance,
        Self::PulmonaryVenousCompliance,
        Self::PulmonaryArterialCompliance,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::HeartRate => "HR",
            Self::Uvr => "UVR",
            Self::Lvr => "LVR",
            Self::Pvr => "PVR",
            Self::ArterialSaturation => "S_sa",
            Self::Hemoglobin => "Hb",
            Self::UpperConsumption => "CVO2u",
            Self::LowerConsumption => "CVO2l",
            Self::DiastolicCompliance => "C_d",
            Self::SystolicCompliance => "C_s",
            Self::ArterialCompliance => "C_sa",
            Self::PulmonaryVenousCompliance => "C_pv",
            Self::PulmonaryArterialCompliance => "C_pa",
        }
    }

    /// Parse a label as printed by [`label`](Self::label), ignoring case.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s))
    }

    fn field<'a>(
        &self,
        params: &'a mut CompartmentParams,
        oxygen: &'a mut CompartmentOxygenParams,
    ) -> &'a mut f64 {
        match self {
            Self::HeartRate => &mut params.heart_rate,
            Self::Uvr => &mut params.uvr,
            Self::Lvr => &mut params.lvr,
            Self::Pvr => &mut params.pvr,
            Self::ArterialSaturation => &mut oxygen.s_sa,
            Self::Hemoglobin => &mut oxygen.hemoglobin,
            Self::UpperConsumption => &mut oxygen.cvo2_upper,
            Self::LowerConsumption => &mut oxygen.cvo2_lower,
            Self::DiastolicCompliance => &mut params.compliances.c_d,
            Self::SystolicCompliance => &mut params.compliances.c_s,
            Self::ArterialCompliance => &mut params.compliances.c_sa,
            Self::PulmonaryVenousCompliance => &mut params.compliances.c_pv,
            Self::PulmonaryArterialCompliance => &mut params.compliances.c_pa,
        }
    }

    /// Baseline value of this input.
    pub fn get(&self, params: &CompartmentParams, oxygen: &CompartmentOxygenParams) -> f64 {
        let (mut p, mut o) = (*params, *oxygen);
        *self.field(&mut p, &mut o)
    }

    pub fn set(&self, params: &mut CompartmentParams, oxygen: &mut CompartmentOxygenParams, value: f64) {
        *self.field(params, oxygen) = value;
    }
}

/// Evaluated grid. `cells[j][i]` holds the solve at `(x[i], y[j])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompartmentGrid {
    pub x_input: CompartmentInput,
    pub y_input: CompartmentInput,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub cells: Vec<Vec<Option<CompartmentSolution>>>,
}

impl CompartmentGrid {
    pub fn get(&self, i: usize, j: usize) -> Option<&CompartmentSolution> {
        self.cells.get(j)?.get(i)?.as_ref()
    }

    /// Extract one output over the grid, keeping failed cells empty.
    pub fn map(&self, f: impl Fn(&CompartmentSolution) -> f64) -> Vec<Vec<Option<f64>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_ref().map(&f)).collect())
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_none()).count()
    }
}

fn span(baseline: f64, n: usize) -> Vec<f64> {
    let (lo, hi) = (0.5 * baseline, 1.5 * baseline);
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + i as f64 * step).collect()
}

fn solve_cell(
    params: &CompartmentParams,
    oxygen: &CompartmentOxygenParams,
    solver: &NewtonRaphson,
) -> Result<Option<CompartmentSolution>> {
    match solve_compartment(params, oxygen, solver) {
        Ok(solution) => Ok(Some(solution)),
        Err(e @ (NorwoodError::NonConvergence { .. } | NorwoodError::SingularMatrix)) => {
            log::debug!("Grid cell failed: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Solve the compartment model on an `n`×`n` grid of two inputs.
pub fn grid_compartment(
    x_input: CompartmentInput,
    y_input: CompartmentInput,
    n: usize,
    params: &CompartmentParams,
    oxygen: &CompartmentOxygenParams,
    solver: &NewtonRaphson,
) -> Result<CompartmentGrid> {
    if n < 2 {
        return Err(NorwoodError::invalid_parameter("n", n as f64, "a grid needs at least two points per axis"));
    }
    if x_input == y_input {
        return Err(NorwoodError::invalid_parameter(
            y_input.label(),
            y_input.get(params, oxygen),
            "grid axes must be different inputs",
        ));
    }
    params.validate()?;
    oxygen.validate()?;

    let x = span(x_input.get(params, oxygen), n);
    let y = span(y_input.get(params, oxygen), n);
    log::info!("Grid {} x {}: {}x{} solves", x_input.label(), y_input.label(), n, n);

    let mut cells = Vec::with_capacity(n);
    for &yv in &y {
        let mut row = Vec::with_capacity(n);
        for &xv in &x {
            let (mut p, mut o) = (*params, *oxygen);
            x_input.set(&mut p, &mut o, xv);
            y_input.set(&mut p, &mut o, yv);
            row.push(solve_cell(&p, &o, solver)?);
        }
        cells.push(row);
    }

    let grid = CompartmentGrid {
        x_input,
        y_input,
        x,
        y,
        cells,
    };
    if grid.failures() > 0 {
        log::warn!("Grid: {} of {} cells failed", grid.failures(), n * n);
    }
    Ok(grid)
}
