//! Error types for dimension setup, solution access and engine loading.

use thiserror::Error;

/// Errors that can occur while building dimensions or reading a solution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QcqpError {
    /// Requested a solution field outside the registry.
    #[error("unknown field '{field}'; available fields are: {available}")]
    UnknownField { field: String, available: String },

    /// Requested a dimension name the descriptor does not track.
    #[error("unknown dimension '{field}'; available dimensions are: {available}")]
    UnknownDimField { field: String, available: String },

    /// Stage index outside `[0, N]`.
    #[error("stage {stage} out of bounds for horizon N = {horizon}")]
    StageOutOfRange { stage: usize, horizon: usize },

    /// Stage range with `end < start`.
    #[error("invalid stage range [{start}, {end}]")]
    InvalidRange { start: usize, end: usize },

    /// Dimension builder rejected its input.
    #[error("invalid dimensions: {0}")]
    InvalidDim(String),

    /// Vector length does not match the field size at that stage.
    #[error("dimension mismatch for '{field}' at stage {stage}: expected {expected}, got {actual}")]
    DimensionMismatch {
        field: &'static str,
        stage: usize,
        expected: usize,
        actual: usize,
    },

    /// Solution storage could not be sized or allocated.
    #[error("failed to allocate {size} bytes of solution storage: {reason}")]
    Allocation { size: usize, reason: String },

    /// Engine does not implement an entry point for this field.
    #[error("engine does not support '{op}' for field '{field}'")]
    Unsupported { op: &'static str, field: &'static str },

    /// Native solver library could not be opened.
    #[error("HPIPM library not found: {0}")]
    LibraryNotFound(String),

    /// Native solver library lacks a required symbol.
    #[error("symbol '{symbol}' not found: {reason}")]
    SymbolNotFound { symbol: String, reason: String },
}

/// Result type for solution container operations.
pub type Result<T> = std::result::Result<T, QcqpError>;
