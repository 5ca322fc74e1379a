//! Error types for level construction.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SaError>;

/// Failures raised while building a smoothed aggregation level. All of them
/// are terminal: no partially built matrix is ever handed back.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaError {
    /// Operand dimensions don't line up
    #[error("{op}: shape mismatch, expected {expected:?}, got {got:?}")]
    InvalidShape {
        op: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// Compressed or coordinate storage that violates its own invariants
    #[error("malformed sparse structure: {0}")]
    MalformedStructure(String),

    /// A diagonal entry needed for a division (or a threshold) is zero
    #[error("{op}: zero diagonal entry in row {row}")]
    SingularDiagonal { op: &'static str, row: usize },

    #[error("{op}: non-finite value produced")]
    NumericOverflow { op: &'static str },

    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Configuration that could not be read or written as JSON
    #[error("config: {0}")]
    Config(String),
}

impl From<sprs::errors::StructureError> for SaError {
    fn from(err: sprs::errors::StructureError) -> Self {
        SaError::MalformedStructure(err.to_string())
    }
}

impl From<serde_json::Error> for SaError {
    fn from(err: serde_json::Error) -> Self {
        SaError::Config(err.to_string())
    }
}
