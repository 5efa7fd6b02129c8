//! Newton-Raphson root-finding for the nonlinear compartment systems.
//!
//! The Jacobian is approximated with forward differences and each Newton
//! step is an exact LU solve on a [`CircuitMatrix`]. The outcome is a
//! [`RootSolution`] that always carries the final iterate together with a
//! convergence flag and a diagnostic message, so callers can branch on
//! convergence without parsing text.

use super::matrix::CircuitMatrix;
use super::{DEFAULT_MAX_EVALUATIONS, DEFAULT_TOLERANCE};
use crate::error::{NorwoodError, Result};

/// Configuration for the Newton-Raphson solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonConfig {
    /// Relative step tolerance: converged once ‖dx‖ ≤ tol·(‖x‖ + tol).
    pub tolerance: f64,
    /// Maximum number of residual evaluations, Jacobian columns included.
    pub max_evaluations: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
        }
    }
}

impl NewtonConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relative step tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the residual evaluation budget.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }
}

/// Outcome of a root-find: the last iterate plus diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RootSolution<T> {
    /// Final iterate (the root when `converged` is true)
    pub value: T,
    /// Whether the step tolerance was met
    pub converged: bool,
    /// Newton iterations performed
    pub iterations: usize,
    /// Residual evaluations performed
    pub evaluations: usize,
    /// Residual norm at the final iterate
    pub residual: f64,
    /// Human-readable diagnostic
    pub message: String,
}

impl<T> RootSolution<T> {
    /// Convert the value while keeping the diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RootSolution<U> {
        RootSolution {
            value: f(self.value),
            converged: self.converged,
            iterations: self.iterations,
            evaluations: self.evaluations,
            residual: self.residual,
            message: self.message,
        }
    }

    /// Return the value, or [`NorwoodError::NonConvergence`] if the solver failed.
    pub fn into_result(self) -> Result<T> {
        if self.converged {
            Ok(self.value)
        } else {
            Err(NorwoodError::non_convergence(
                self.iterations,
                self.evaluations,
                self.residual,
                self.message,
            ))
        }
    }
}

/// Newton-Raphson solver for small dense nonlinear systems.
#[derive(Debug, Clone, Default)]
pub struct NewtonRaphson {
    pub config: NewtonConfig,
}

impl NewtonRaphson {
    /// Create a new Newton-Raphson solver with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a solver with custom configuration.
    pub fn with_config(config: NewtonConfig) -> Self {
        Self { config }
    }

    /// Find x with f(x) = 0 starting from `x0`.
    ///
    /// `f` writes the residual of `x` into its second argument, which has the
    /// same length as `x`.
    pub fn solve<F>(&self, mut f: F, x0: &[f64]) -> RootSolution<Vec<f64>>
    where
        F: FnMut(&[f64], &mut [f64]),
    {
        let n = x0.len();
        let tol = self.config.tolerance;
        let mut x = x0.to_vec();
        let mut fx = vec![0.0; n];
        let mut fp = vec![0.0; n];
        let mut probe = vec![0.0; n];
        let mut jacobian = CircuitMatrix::new(n);

        f(&x, &mut fx);
        let mut evaluations = 1;
        let mut iterations = 0;

        let outcome = |x: Vec<f64>,
                       fx: &[f64],
                       iterations: usize,
                       evaluations: usize,
                       converged: bool,
                       message: String| {
            let residual = norm(fx);
            if converged {
                log::debug!("Newton converged in {} iterations (residual {:.3e})", iterations, residual);
            } else {
                log::warn!("Newton failed after {} iterations: {}", iterations, message);
            }
            RootSolution {
                value: x,
                converged,
                iterations,
                evaluations,
                residual,
                message,
            }
        };

        if !fx.iter().all(|v| v.is_finite()) {
            return outcome(x, &fx, 0, evaluations, false, "residual is not finite at the initial guess".into());
        }

        loop {
            if evaluations + n + 1 > self.config.max_evaluations {
                let message = format!(
                    "evaluation budget of {} exhausted before the step tolerance {:e} was met",
                    self.config.max_evaluations, tol
                );
                return outcome(x, &fx, iterations, evaluations, false, message);
            }

            // Forward-difference Jacobian
            jacobian.clear();
            for j in 0..n {
                let h = f64::EPSILON.sqrt() * x[j].abs().max(1.0);
                probe.copy_from_slice(&x);
                probe[j] += h;
                f(&probe, &mut fp);
                evaluations += 1;
                for i in 0..n {
                    jacobian.set(i, j, (fp[i] - fx[i]) / h);
                }
            }
            for i in 0..n {
                jacobian.set_rhs(i, -fx[i]);
            }

            if jacobian.factor().and_then(|_| jacobian.solve()).is_err() {
                return outcome(x, &fx, iterations, evaluations, false, "Jacobian is singular".into());
            }

            for (xi, dxi) in x.iter_mut().zip(&jacobian.x) {
                *xi += dxi;
            }
            f(&x, &mut fx);
            evaluations += 1;
            iterations += 1;

            if !fx.iter().all(|v| v.is_finite()) {
                return outcome(x, &fx, iterations, evaluations, false, "residual became non-finite".into());
            }

            let step = norm(&jacobian.x);
            if step <= tol * (norm(&x) + tol) {
                return outcome(x, &fx, iterations, evaluations, true, "The solution converged.".into());
            }
        }
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}
