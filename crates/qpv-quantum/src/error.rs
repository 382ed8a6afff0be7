//! Error types for the quantum capability crate.

use thiserror::Error;

/// Errors raised by quantum operations and error-model construction.
///
/// Physical loss is never an error; it is reported through
/// [`QuantumRegister::is_lost`](crate::QuantumRegister::is_lost).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuantumError {
    /// A depolarising parameter falls outside the completely-positive range.
    #[error(
        "depolarising parameter {xi} violates complete positivity (must lie in [{lower}, {upper}])"
    )]
    CompletePositivity {
        /// Computed depolarising parameter.
        xi: f64,
        /// Lower bound `-1/(d²-1)`.
        lower: f64,
        /// Upper bound (always 1).
        upper: f64,
    },

    /// A probability-like parameter is outside `[0, 1]`.
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidProbability {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A length or duration is negative or not finite.
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidMagnitude {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Basis parameters outside the range of the preparation gate.
    #[error("invalid basis (theta={theta}, phi={phi}) for m={m}")]
    InvalidBasis {
        /// Polar index.
        theta: u32,
        /// Azimuthal index.
        phi: u32,
        /// Basis resolution.
        m: u32,
    },
}

/// Result type for quantum operations.
pub type QuantumResult<T> = Result<T, QuantumError>;

/// Check that `value` is a probability.
pub(crate) fn check_probability(name: &'static str, value: f64) -> QuantumResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(QuantumError::InvalidProbability { name, value })
    }
}

/// Check that `value` is a finite, non-negative magnitude.
pub(crate) fn check_magnitude(name: &'static str, value: f64) -> QuantumResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(QuantumError::InvalidMagnitude { name, value })
    }
}
