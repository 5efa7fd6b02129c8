//! Parameter validation.
//!
//! Every solver validates its inputs before any numerical work. The checks
//! reject NaN as well as out-of-range values.

use crate::error::{NorwoodError, Result};

/// Require `value > 0`.
pub fn require_positive(param: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NorwoodError::invalid_parameter(param, value, "must be positive"))
    }
}

/// Require `value >= 0`.
pub fn require_non_negative(param: &str, value: f64) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NorwoodError::invalid_parameter(param, value, "must be >= 0"))
    }
}

/// Require `0 < value <= 1`.
pub fn require_fraction(param: &str, value: f64) -> Result<()> {
    require_positive(param, value)?;
    if value > 1.0 {
        return Err(NorwoodError::invalid_parameter(
            param,
            value,
            "must be less than or equal to 1",
        ));
    }
    Ok(())
}

/// Require a finite value of any sign.
pub fn require_finite(param: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NorwoodError::invalid_parameter(param, value, "must be finite"))
    }
}

/// Validate a list of `(name, value)` pairs that must all be positive.
pub fn require_all_positive(fields: &[(&str, f64)]) -> Result<()> {
    for &(name, value) in fields {
        require_positive(name, value)?;
    }
    Ok(())
}

/// Validate a time grid: `span > 0`, `dt > 0` and `dt <= span`.
pub fn require_time_grid(span_name: &str, span: f64, dt: f64) -> Result<()> {
    require_positive(span_name, span)?;
    require_positive("dt", dt)?;
    if dt > span {
        return Err(NorwoodError::invalid_parameter(
            "dt",
            dt,
            format!("must not exceed {span_name} ({span})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_positive() {
        assert!(require_positive("HR", 140.0).is_ok());
        assert!(require_positive("HR", 0.0).is_err());
        assert!(require_positive("HR", -3.0).is_err());
        assert!(require_positive("HR", f64::NAN).is_err());
        assert!(require_positive("HR", f64::INFINITY).is_err());
    }

    #[test]
    fn test_require_fraction() {
        assert!(require_fraction("EF", 1.0).is_ok());
        assert!(require_fraction("EF", 1e-12).is_ok());
        let err = require_fraction("EF", 1.01).unwrap_err();
        assert_eq!(err.param(), Some("EF"));
        assert!(require_fraction("EF", 0.0).is_err());
    }

    #[test]
    fn test_require_time_grid() {
        assert!(require_time_grid("t_end", 1.0, 0.1).is_ok());
        assert!(require_time_grid("t_end", 1.0, 1.0).is_ok());
        assert!(require_time_grid("t_end", 1.0, 2.0).is_err());
        assert!(require_time_grid("t_end", 0.0, 0.1).is_err());
        assert!(require_time_grid("t_end", 1.0, 0.0).is_err());
    }
}
