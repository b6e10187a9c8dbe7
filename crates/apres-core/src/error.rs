//! Validation errors for wire models

use thiserror::Error;

/// Errors raised while validating configuration values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{field} values should be 1 or 0, got '{value}'")]
    InvalidAntennaFlag { field: String, value: String },

    #[error("{field} should have {expected} entries, got {actual}")]
    AntennaLength {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("{field} must have at least one active antenna")]
    NoActiveAntenna { field: String },

    #[error("{field} must be one of -14, -4 or 6, got {value}")]
    InvalidAfGain { field: String, value: i32 },
}
