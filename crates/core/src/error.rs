//! Error types for lakeparam

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for lakeparam operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input file is empty: {}", path.display())]
    EmptyInput { path: PathBuf },

    #[error("invalid ASCII grid at line {line}: {reason}")]
    InvalidGrid { line: usize, reason: String },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("No valid value in this grid {grid_id}")]
    NoValidData { grid_id: String },

    #[error("cannot allocate memory for {structure}")]
    Allocation { structure: &'static str },

    #[error("Total wetland fraction does not match: profile area {profile_area:.6}, expected {expected:.6}")]
    ProfileInconsistent { profile_area: f64, expected: f64 },

    #[error("Output option is not recognized: {0}")]
    UnknownSchema(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for lakeparam operations
pub type Result<T> = std::result::Result<T, Error>;
