//! Dense circuit matrix assembly and solving.
//!
//! Each row of a [`CircuitMatrix`] is one circuit equation: a resistance
//! law, a flow balance, a compliance charge law or a volume constraint.
//! Square systems with a guaranteed-nonsingular topology are solved exactly
//! with LU decomposition; systems that may carry a redundant row are solved
//! in the least-squares sense through an SVD.

use nalgebra::{DMatrix, DVector};

use crate::error::{NorwoodError, Result};

/// Pivot magnitude below which the LU factorization reports a singular matrix.
pub const PIVOT_TOLERANCE: f64 = 1e-15;

/// Iteration cap for the SVD used by least-squares solves.
const SVD_MAX_ITERATIONS: usize = 1000;

/// Circuit equation system Ax = z.
#[derive(Debug, Clone)]
pub struct CircuitMatrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Right-hand side z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A
    lu: Vec<f64>,
    /// Pivot indices for LU decomposition
    pivots: Vec<usize>,
}

impl CircuitMatrix {
    /// Create an all-zero system of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
            lu: vec![0.0; size * size],
            pivots: vec![0; size],
        }
    }

    /// Clear the matrix and right-hand side to zero.
    pub fn clear(&mut self) {
        self.a.fill(0.0);
        self.z.fill(0.0);
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.size + col]
    }

    /// Set matrix element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] = value;
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Set right-hand side element.
    pub fn set_rhs(&mut self, row: usize, value: f64) {
        self.z[row] = value;
    }

    /// Add to right-hand side element.
    pub fn add_rhs(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Stamp a resistance law: R·Q = P_up − P_down.
    ///
    ///   A[row, flow]       += R
    ///   A[row, upstream]   -= 1
    ///   A[row, downstream] += 1
    pub fn stamp_resistance(
        &mut self,
        row: usize,
        flow: usize,
        resistance: f64,
        upstream: usize,
        downstream: usize,
    ) {
        self.add(row, flow, resistance);
        self.add(row, upstream, -1.0);
        self.add(row, downstream, 1.0);
    }

    /// Stamp an identity between two unknowns: x[a] = x[b].
    pub fn stamp_equal(&mut self, row: usize, a: usize, b: usize) {
        self.add(row, a, 1.0);
        self.add(row, b, -1.0);
    }

    /// Stamp a weighted sum: Σ w·x[col] = value.
    pub fn stamp_sum(&mut self, row: usize, terms: &[(usize, f64)], value: f64) {
        for &(col, weight) in terms {
            self.add(row, col, weight);
        }
        self.add_rhs(row, value);
    }

    /// Stamp a backward-Euler compliance charge law.
    ///
    /// C·(P − P_prev)/dt = Q_in − Q_out, multiplied through by dt:
    ///   C·P − dt·Q_in + dt·Q_out = C·P_prev
    #[allow(clippy::too_many_arguments)]
    pub fn stamp_compliance(
        &mut self,
        row: usize,
        pressure: usize,
        inflow: usize,
        outflow: usize,
        compliance: f64,
        dt: f64,
        p_prev: f64,
    ) {
        self.add(row, pressure, compliance);
        self.add(row, inflow, -dt);
        self.add(row, outflow, dt);
        self.add_rhs(row, compliance * p_prev);
    }

    /// Perform LU decomposition with partial pivoting.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        for i in 0..n {
            self.pivots[i] = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            // NaN never compares greater, so test the negation
            if !(max_val >= PIVOT_TOLERANCE) {
                return Err(NorwoodError::SingularMatrix);
            }

            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) -> Result<()> {
        let n = self.size;

        // Apply pivot permutation to z
        for i in 0..n {
            self.x[i] = self.z[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
            let diag = self.lu[i * n + i];
            if diag.abs() < PIVOT_TOLERANCE {
                return Err(NorwoodError::SingularMatrix);
            }
            self.x[i] /= diag;
        }

        Ok(())
    }

    /// Factor and solve exactly. Fails on a singular matrix; there is no
    /// fallback to least squares.
    pub fn solve_exact(&mut self) -> Result<Vec<f64>> {
        self.factor()?;
        self.solve()?;
        Ok(self.x.clone())
    }

    /// Solve in the least-squares sense and store the result in `x`.
    pub fn solve_least_squares(&mut self) -> Result<LeastSquares> {
        let a = DMatrix::from_row_slice(self.size, self.size, &self.a);
        let b = DVector::from_column_slice(&self.z);
        let fit = least_squares(a, &b)?;
        self.x.copy_from_slice(&fit.x);
        Ok(fit)
    }

    /// Residual ‖Ax − z‖₂ of the current solution.
    pub fn residual(&self) -> f64 {
        let n = self.size;
        (0..n)
            .map(|i| {
                let row: f64 = (0..n).map(|j| self.a[i * n + j] * self.x[j]).sum();
                (row - self.z[i]).powi(2)
            })
            .sum::<f64>()
            .sqrt()
    }
}

/// Least-squares solution with its quality diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquares {
    /// Minimum-norm best-fit solution
    pub x: Vec<f64>,
    /// Residual norm ‖Ax − b‖₂
    pub residual: f64,
    /// Numerical rank of A
    pub rank: usize,
}

impl LeastSquares {
    /// Whether A had full column rank.
    pub fn is_full_rank(&self, cols: usize) -> bool {
        self.rank == cols
    }
}

/// Solve `min ‖Ax − b‖₂` for a dense (possibly rectangular) A.
///
/// Rank deficiency is not an error: singular values below
/// `ε·max(m, n)·σ_max` are dropped and the minimum-norm solution is returned
/// together with the rank and residual.
pub fn least_squares(a: DMatrix<f64>, b: &DVector<f64>) -> Result<LeastSquares> {
    let (rows, cols) = a.shape();
    if rows != b.len() {
        return Err(NorwoodError::dimension_mismatch(
            "least-squares right-hand side",
            rows,
            b.len(),
        ));
    }
    if let Some(bad) = a.iter().chain(b.iter()).find(|v| !v.is_finite()) {
        return Err(NorwoodError::invalid_parameter(
            "least-squares system",
            *bad,
            "entries must be finite",
        ));
    }

    let a_copy = a.clone();
    let svd = a
        .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or(NorwoodError::SingularMatrix)?;

    let sigma_max = svd.singular_values.iter().cloned().fold(0.0, f64::max);
    let cutoff = f64::EPSILON * rows.max(cols) as f64 * sigma_max;
    let rank = svd.rank(cutoff);
    let x = svd.solve(b, cutoff).map_err(|_| NorwoodError::SingularMatrix)?;
    let residual = (&a_copy * &x - b).norm();

    if rank < cols.min(rows) {
        log::warn!(
            "Rank-deficient least-squares fit: rank {} of {} (residual {:.3e})",
            rank,
            cols.min(rows),
            residual
        );
    } else {
        log::debug!("Least-squares fit: rank {}, residual {:.3e}", rank, residual);
    }

    Ok(LeastSquares {
        x: x.iter().cloned().collect(),
        residual,
        rank,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn matrix_from_rows(rows: &[&[f64]], rhs: &[f64]) -> CircuitMatrix {
        let n = rows.len();
        let mut m = CircuitMatrix::new(n);
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                m.set(i, j, v);
            }
            m.set_rhs(i, rhs[i]);
        }
        m
    }

    #[test]
    fn test_solve_exact_simple() {
        // 2x + y = 5
        // x + 3y = 6
        // Solution: x = 1.8, y = 1.4
        let mut m = matrix_from_rows(&[&[2.0, 1.0], &[1.0, 3.0]], &[5.0, 6.0]);
        let x = m.solve_exact().unwrap();
        assert_relative_eq!(x[0], 1.8, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.4, epsilon = 1e-12);
        assert!(m.residual() < 1e-12);
    }

    #[test]
    fn test_solve_exact_needs_pivoting() {
        let mut m = matrix_from_rows(
            &[&[0.0, 1.0, 1.0], &[1.0, 0.0, 1.0], &[1.0, 1.0, 0.0]],
            &[5.0, 4.0, 3.0],
        );
        let x = m.solve_exact().unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_matrix() {
        // Row 2 = 2 * row 1
        let mut m = matrix_from_rows(&[&[1.0, 2.0], &[2.0, 4.0]], &[1.0, 2.0]);
        assert!(matches!(m.solve_exact(), Err(NorwoodError::SingularMatrix)));
    }

    #[test]
    fn test_least_squares_redundant_row() {
        // x = 1, y = 2, and a redundant copy of x + y = 3
        let mut m = matrix_from_rows(
            &[&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[1.0, 1.0, 0.0]],
            &[1.0, 2.0, 3.0],
        );
        let fit = m.solve_least_squares().unwrap();
        assert_eq!(fit.rank, 2);
        assert!(!fit.is_full_rank(3));
        assert_relative_eq!(fit.x[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(fit.x[1], 2.0, epsilon = 1e-10);
        // Minimum-norm choice for the free unknown
        assert!(fit.x[2].abs() < 1e-10);
        assert!(fit.residual < 1e-10);
        assert_relative_eq!(m.x[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_least_squares_overdetermined() {
        // Fit y = c * t to (1, 2.1), (2, 3.9), (3, 6.0)
        let a = DMatrix::from_column_slice(3, 1, &[1.0, 2.0, 3.0]);
        let b = DVector::from_column_slice(&[2.1, 3.9, 6.0]);
        let fit = least_squares(a, &b).unwrap();
        let expected = (2.1 + 2.0 * 3.9 + 3.0 * 6.0) / 14.0;
        assert_relative_eq!(fit.x[0], expected, epsilon = 1e-12);
        assert_eq!(fit.rank, 1);
        assert!(fit.residual > 0.0);
    }

    #[test]
    fn test_least_squares_zero_matrix() {
        let a = DMatrix::zeros(3, 1);
        let b = DVector::from_column_slice(&[1.0, 1.0, 1.0]);
        let fit = least_squares(a, &b).unwrap();
        assert_eq!(fit.rank, 0);
        assert_eq!(fit.x[0], 0.0);
        assert_relative_eq!(fit.residual, 3.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_least_squares_rejects_nan() {
        let a = DMatrix::from_column_slice(2, 1, &[1.0, f64::NAN]);
        let b = DVector::from_column_slice(&[1.0, 1.0]);
        assert!(matches!(
            least_squares(a, &b),
            Err(NorwoodError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_stamp_resistance_and_compliance() {
        let mut m = CircuitMatrix::new(4);
        m.stamp_resistance(0, 0, 5.0, 1, 2);
        assert_eq!(m.get(0, 0), 5.0);
        assert_eq!(m.get(0, 1), -1.0);
        assert_eq!(m.get(0, 2), 1.0);

        m.stamp_compliance(1, 1, 0, 3, 0.5, 0.01, 80.0);
        assert_eq!(m.get(1, 1), 0.5);
        assert_eq!(m.get(1, 0), -0.01);
        assert_eq!(m.get(1, 3), 0.01);
        assert_eq!(m.z[1], 40.0);

        m.clear();
        assert!(m.a.iter().all(|&v| v == 0.0));
        assert!(m.z.iter().all(|&v| v == 0.0));
    }
}
