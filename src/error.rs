//! Error types for the Norwood circulation solvers.
//!
//! This module provides a unified error type [`NorwoodError`] that covers
//! all error conditions that can occur during parameter validation,
//! linear and nonlinear solving, time stepping and configuration loading.

use thiserror::Error;

/// Result type alias using [`NorwoodError`].
pub type Result<T> = std::result::Result<T, NorwoodError>;

/// Unified error type for all solver operations.
#[derive(Error, Debug)]
pub enum NorwoodError {
    // ============ Input Errors ============
    /// A required input is non-positive, out of range or not finite
    #[error("Invalid parameter '{param}' (got {value}): {message}")]
    InvalidParameter {
        param: String,
        value: f64,
        message: String,
    },

    /// Sample arrays or matrix operands do not line up
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// The driving waveform produced a value that cannot be stepped
    #[error("Driving waveform returned {value} at t = {time}")]
    InvalidWaveform { time: f64, value: f64 },

    // ============ Numerical Errors ============
    /// Exact solve attempted on a numerically singular matrix
    #[error("Singular matrix - circuit equations are not independent")]
    SingularMatrix,

    /// Iterative root-find failed
    #[error("Root-finder did not converge after {iterations} iterations ({evaluations} evaluations, residual {residual:.2e}): {message}")]
    NonConvergence {
        iterations: usize,
        evaluations: usize,
        residual: f64,
        message: String,
    },

    // ============ Configuration Errors ============
    /// Error reading a parameter file
    #[error("Failed to read parameter file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error decoding a parameter file
    #[error("Failed to parse parameter file '{path}': {message}")]
    ConfigParse { path: String, message: String },
}

impl NorwoodError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(param: impl Into<String>, value: f64, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            value,
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Create a convergence failure error
    pub fn non_convergence(
        iterations: usize,
        evaluations: usize,
        residual: f64,
        message: impl Into<String>,
    ) -> Self {
        Self::NonConvergence {
            iterations,
            evaluations,
            residual,
            message: message.into(),
        }
    }

    /// Name of the offending field, if this is an input error.
    pub fn param(&self) -> Option<&str> {
        match self {
            Self::InvalidParameter { param, .. } => Some(param),
            _ => None,
        }
    }
}
