//! # trilerp
//!
//! Trilinear interpolation of gridded time × latitude × longitude fields at
//! scattered query points.
//!
//! Typical use is matching in-situ observations (drifting floats, ship tracks)
//! against a satellite product such as chlorophyll concentration: every
//! observation gets the field value interpolated from the eight grid nodes
//! surrounding it in space and time.
//!
//! ## Key Features
//!
//! - **Direction-agnostic axes**: ascending or descending coordinates are detected at load time
//! - **Missing-data repair**: gaps among the eight corners are filled with the local mean
//! - **Per-point diagnostics**: failures are isolated to the offending point
//! - **Parallel batches**: points are processed independently on a rayon pool
//!
//! ## Architecture
//!
//! - **Data Layer**: [`grid`] holds the field; [`data_loader`] reads it from NetCDF
//! - **Processing**: [`interpolation`] runs the filter → locate → gather → combine pipeline
//! - **I/O**: [`query`] reads query points; [`output`] writes JSON or Arrow results
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use ndarray::Array3;
//! use trilerp::{interpolate, Grid, InterpolationOptions, QueryPoint};
//!
//! let values = Array3::from_shape_fn((2, 2, 2), |(t, y, x)| (t + y + x) as f32);
//! let grid = Grid::new(
//!     "field",
//!     vec![0.0, 1.0],
//!     vec![1.0, 0.0],
//!     vec![0.0, 1.0],
//!     values,
//! )
//! .unwrap();
//!
//! let noon = Utc.with_ymd_and_hms(1970, 1, 1, 12, 0, 0).unwrap();
//! let queries = vec![QueryPoint::new("a", noon, 0.5, 0.5)];
//!
//! let output = interpolate(&grid, &queries, &InterpolationOptions::default()).unwrap();
//! assert!((output.results[0].value.unwrap() - 1.5).abs() < 1e-9);
//! ```

pub mod config;
#[cfg(feature = "netcdf")]
pub mod data_loader;
pub mod error;
pub mod grid;
pub mod interpolation;
pub mod logging;
pub mod output;
pub mod query;

pub use config::Config;
pub use error::{Result, TrilerpError};
pub use grid::{Axis, Direction, Grid};
pub use interpolation::{
    interpolate, interpolate_chunked, InterpolationOptions, OverflowPolicy, TraceHook,
    TracingHook,
};
pub use logging::{
    init_tracing, log_batch_summary, log_diagnostics, log_error, log_operation_end,
    log_operation_start, log_timed_operation,
};
pub use output::{BatchSummary, InterpolatedPoint, InterpolationOutput, PointDiagnostic, PointIssue};
pub use query::QueryPoint;
