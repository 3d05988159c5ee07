//! Error types for trilerp.
//!
//! Batch-level failures (malformed grids, I/O, configuration) are reported
//! through [`TrilerpError`]. Problems that only affect a single query point are
//! not errors at this level; they are recorded as
//! [`PointDiagnostic`](crate::output::PointDiagnostic)s next to the results,
//! unless the caller asked for the abort policy.

use thiserror::Error;

/// The main error type for trilerp operations.
#[derive(Error, Debug)]
pub enum TrilerpError {
    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Output encoding errors
    #[error("Conversion error: {message}")]
    Conversion { message: String },

    /// Array shape errors
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The grid violates a structural invariant
    #[error("Invalid grid: {message}")]
    InvalidGrid { message: String },

    /// Two neighbouring coordinates of an axis are equal, so the cell between
    /// them has zero width
    #[error("Degenerate axis {axis}: duplicate coordinate at index {index}")]
    DegenerateAxis { axis: String, index: usize },

    /// A bracketing index fell outside its axis and the caller chose to abort
    #[error("Index out of range on axis {axis} for point {id}: next index {index} not in 0..{len}")]
    OutOfBoundsIndex {
        axis: String,
        id: String,
        index: isize,
        len: usize,
    },

    /// Data not found errors
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// Malformed query input
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },
}

/// Convenience type alias for Results with TrilerpError
pub type Result<T> = std::result::Result<T, TrilerpError>;
