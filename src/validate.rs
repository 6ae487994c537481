//! Input validation helpers.
//!
//! Standardizes validation across the crate using `!is_finite()` to reject
//! NaN, +Inf, and -Inf uniformly.

use crate::error::QuantLensError;

/// Validate that a value is strictly positive and finite (rejects NaN, Inf, zero, negatives).
pub(crate) fn validate_positive(value: f64, name: &str) -> crate::error::Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(QuantLensError::ConfigurationError {
            message: format!("{name} must be positive and finite, got {value}"),
        });
    }
    Ok(value)
}

/// Validate that a value is finite (rejects NaN and Inf; allows zero and negatives).
pub(crate) fn validate_finite(value: f64, name: &str) -> crate::error::Result<f64> {
    if !value.is_finite() {
        return Err(QuantLensError::ConfigurationError {
            message: format!("{name} must be finite, got {value}"),
        });
    }
    Ok(value)
}

/// Validate that a value lies in the open unit interval (0, 1).
pub(crate) fn validate_unit_interval(value: f64, name: &str) -> crate::error::Result<f64> {
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        return Err(QuantLensError::ConfigurationError {
            message: format!("{name} must be in (0, 1), got {value}"),
        });
    }
    Ok(value)
}

/// Validate that two aligned inputs have the same length.
pub(crate) fn validate_same_len(a: usize, b: usize, what: &str) -> crate::error::Result<()> {
    if a != b {
        return Err(QuantLensError::ShapeError {
            message: format!("{what}: lengths differ ({a} vs {b})"),
        });
    }
    Ok(())
}
