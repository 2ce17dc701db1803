//! Construction-time errors.
//!
//! Ticks never fail: every numeric edge case inside an engine is handled by
//! substitution (clamping, fallback values). The only rejected inputs are
//! inconsistent grids and invalid configuration, caught before the first tick.

use std::fmt;

/// Errors raised while building a simulation
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// Grid side is too small to have interior cells
    InvalidGridSize { size: usize },
    /// A supplied field does not match the grid dimensions
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A configuration value is out of range or non-finite
    InvalidParameter { name: &'static str, value: f32 },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InvalidGridSize { size } => {
                write!(f, "Grid size must be at least 3, got {size}")
            }
            SimError::DimensionMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "Field '{field}' has {actual} cells, expected {expected}"
            ),
            SimError::InvalidParameter { name, value } => {
                write!(f, "Parameter {name} is out of range, got {value}")
            }
        }
    }
}

impl std::error::Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SimError::DimensionMismatch {
            field: "elevation",
            expected: 9,
            actual: 4,
        };
        assert_eq!(err.to_string(), "Field 'elevation' has 4 cells, expected 9");

        let err = SimError::InvalidGridSize { size: 1 };
        assert!(err.to_string().contains("at least 3"));
    }
}
