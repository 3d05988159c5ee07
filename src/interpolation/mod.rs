//! Trilinear interpolation of a gridded field at scattered query points.
//!
//! A batch flows through four stages, each in its own module:
//!
//! 1. [`bounds`]: drop points outside the grid's lat/lon envelope
//! 2. [`axis`]: bracket every remaining point on the time, lat and lon axes
//! 3. [`gather`]: read the eight corner samples of each bracketing cell
//! 4. [`combine`]: repair missing samples and reduce with tensor-product weights
//!
//! Every point is processed independently, so the per-point stages run on the
//! rayon thread pool. Output order always matches input order.

pub mod axis;
pub mod bounds;
pub mod combine;
pub mod gather;
pub mod trace;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TrilerpError};
use crate::grid::{days_since_epoch, Axis, Grid};
use crate::output::{
    BatchSummary, InterpolatedPoint, InterpolationOutput, PointDiagnostic, PointIssue,
};
use crate::query::QueryPoint;

use self::axis::{locate_batch, AxisLocation, LocateError};
use self::gather::CellLocation;
pub use self::trace::{TraceEvent, TraceHook, TracingHook};

/// What to do with a point whose bracketing index falls outside an axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Leave the point out of the results and record a diagnostic
    #[default]
    Skip,
    /// Fail the whole batch
    Abort,
}

impl FromStr for OverflowPolicy {
    type Err = TrilerpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(OverflowPolicy::Skip),
            "abort" => Ok(OverflowPolicy::Abort),
            _ => Err(TrilerpError::Config {
                message: format!("Unknown out-of-range policy: {}. Must be skip or abort", s),
            }),
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Skip => write!(f, "skip"),
            OverflowPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Knobs for one interpolation run
#[derive(Clone)]
pub struct InterpolationOptions {
    pub overflow_policy: OverflowPolicy,
    /// Smallest number of points handed to one rayon task
    pub min_points_per_task: usize,
    /// Receives per-stage events; `None` disables tracing
    pub trace: Option<Arc<dyn TraceHook>>,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self {
            overflow_policy: OverflowPolicy::Skip,
            min_points_per_task: 256,
            trace: None,
        }
    }
}

impl fmt::Debug for InterpolationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpolationOptions")
            .field("overflow_policy", &self.overflow_policy)
            .field("min_points_per_task", &self.min_points_per_task)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

impl InterpolationOptions {
    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn with_trace(mut self, hook: Arc<dyn TraceHook>) -> Self {
        self.trace = Some(hook);
        self
    }

    fn emit(&self, event: TraceEvent<'_>) {
        if let Some(hook) = &self.trace {
            hook.on_event(&event);
        }
    }
}

/// Interpolate `grid` at every point of `queries`.
///
/// Points outside the lat/lon envelope are dropped silently and counted in
/// the summary. Points that cannot be bracketed are dropped with a
/// diagnostic, or fail the call under [`OverflowPolicy::Abort`]. Points whose
/// eight corners are all missing stay in the results with `value: None`.
pub fn interpolate(
    grid: &Grid,
    queries: &[QueryPoint],
    options: &InterpolationOptions,
) -> Result<InterpolationOutput> {
    let min_len = options.min_points_per_task.max(1);
    let mut summary = BatchSummary {
        input: queries.len(),
        ..Default::default()
    };
    let mut diagnostics = Vec::new();

    // Stage 1: bounds filter
    let envelope = grid.envelope();
    let kept = envelope.filter(queries);
    summary.out_of_envelope = queries.len() - kept.len();
    options.emit(TraceEvent::Filtered {
        envelope: &envelope,
        input: queries.len(),
        kept: kept.len(),
    });

    // Stage 2: bracket each axis across the whole batch
    let times: Vec<f64> = kept.iter().map(|&i| days_since_epoch(&queries[i].time)).collect();
    let lats: Vec<f64> = kept.iter().map(|&i| queries[i].lat).collect();
    let lons: Vec<f64> = kept.iter().map(|&i| queries[i].lon).collect();

    let time_locs = locate_batch(grid.time(), &times, min_len);
    let lat_locs = locate_batch(grid.lat(), &lats, min_len);
    let lon_locs = locate_batch(grid.lon(), &lons, min_len);

    let mut positions = Vec::with_capacity(kept.len());
    let mut cells = Vec::with_capacity(kept.len());
    for (k, &position) in kept.iter().enumerate() {
        let query = &queries[position];
        let located = [
            (grid.time(), time_locs[k]),
            (grid.lat(), lat_locs[k]),
            (grid.lon(), lon_locs[k]),
        ];

        match resolve_cell(query, &located, options)? {
            Ok(cell) => {
                positions.push(position);
                cells.push(cell);
            }
            Err(issue) => {
                summary.out_of_range += 1;
                diagnostics.push(PointDiagnostic {
                    position,
                    id: query.id.clone(),
                    issue,
                });
            }
        }
    }

    // Stage 3: gather the eight corners of every cell
    let mut samples = gather::gather(grid, &cells, min_len);
    let weights = combine::weight_matrix(&cells);

    if options.trace.is_some() {
        for (j, &position) in positions.iter().enumerate() {
            let column = |m: &ndarray::Array2<f64>| {
                let mut out = [0.0; gather::CORNERS];
                for (dst, src) in out.iter_mut().zip(m.column(j)) {
                    *dst = *src;
                }
                out
            };
            options.emit(TraceEvent::Corners {
                id: &queries[position].id,
                samples: &column(&samples),
                weights: &column(&weights),
            });
        }
    }

    // Stage 4: repair and reduce
    let combined = combine::combine(&mut samples, &weights);

    let mut results = Vec::with_capacity(combined.len());
    for (&position, point) in positions.iter().zip(combined) {
        let query = &queries[position];
        let value = point.map(|c| c.value);
        let repaired = point.map_or(0, |c| c.repair.replaced);
        options.emit(TraceEvent::Value {
            id: &query.id,
            value,
            repaired,
        });
        if repaired > 0 {
            summary.repaired += 1;
        }
        if value.is_none() {
            summary.all_missing += 1;
            diagnostics.push(PointDiagnostic {
                position,
                id: query.id.clone(),
                issue: PointIssue::AllMissing,
            });
        }
        results.push(InterpolatedPoint::from_query(query, value));
    }
    summary.interpolated = results.len();
    diagnostics.sort_by_key(|d| d.position);

    debug!(
        variable = grid.variable(),
        input = summary.input,
        out_of_envelope = summary.out_of_envelope,
        out_of_range = summary.out_of_range,
        all_missing = summary.all_missing,
        repaired = summary.repaired,
        interpolated = summary.interpolated,
        "Interpolation finished"
    );

    Ok(InterpolationOutput {
        variable: grid.variable().to_string(),
        results,
        diagnostics,
        summary,
    })
}

/// Turn the three axis results of one point into a cell.
///
/// The outer `Result` carries batch-level failures; the inner one a
/// per-point issue under the skip policy.
fn resolve_cell(
    query: &QueryPoint,
    located: &[(&Axis, std::result::Result<AxisLocation, LocateError>); 3],
    options: &InterpolationOptions,
) -> Result<std::result::Result<CellLocation, PointIssue>> {
    let [time, lat, lon] = located;

    let time = match resolve_axis(query, time, options)? {
        Ok(location) => location,
        Err(issue) => return Ok(Err(issue)),
    };
    let lat = match resolve_axis(query, lat, options)? {
        Ok(location) => location,
        Err(issue) => return Ok(Err(issue)),
    };
    let lon = match resolve_axis(query, lon, options)? {
        Ok(location) => location,
        Err(issue) => return Ok(Err(issue)),
    };

    Ok(Ok(CellLocation { time, lat, lon }))
}

fn resolve_axis(
    query: &QueryPoint,
    (axis, result): &(&Axis, std::result::Result<AxisLocation, LocateError>),
    options: &InterpolationOptions,
) -> Result<std::result::Result<AxisLocation, PointIssue>> {
    match *result {
        Ok(location) => {
            options.emit(TraceEvent::Located {
                id: &query.id,
                axis: axis.name(),
                location: &location,
            });
            Ok(Ok(location))
        }
        Err(LocateError::Degenerate { index }) => Err(TrilerpError::DegenerateAxis {
            axis: axis.name().to_string(),
            index,
        }),
        Err(LocateError::OutOfRange { index, len }) => match options.overflow_policy {
            OverflowPolicy::Abort => Err(TrilerpError::OutOfBoundsIndex {
                axis: axis.name().to_string(),
                id: query.id.clone(),
                index,
                len,
            }),
            OverflowPolicy::Skip => Ok(Err(PointIssue::OutOfRange {
                axis: axis.name().to_string(),
                index,
                len,
            })),
        },
    }
}

/// Interpolate a batch split into chunks of `chunk_size` points.
///
/// Chunks are processed one after another and their outputs merged; the
/// result is identical to a single [`interpolate`] call over the whole batch.
pub fn interpolate_chunked(
    grid: &Grid,
    queries: &[QueryPoint],
    chunk_size: usize,
    options: &InterpolationOptions,
) -> Result<InterpolationOutput> {
    let chunk_size = chunk_size.max(1);
    let mut merged = InterpolationOutput {
        variable: grid.variable().to_string(),
        ..Default::default()
    };

    for (n, chunk) in queries.chunks(chunk_size).enumerate() {
        let offset = n * chunk_size;
        let part = interpolate(grid, chunk, options)?;

        merged.results.extend(part.results);
        merged
            .diagnostics
            .extend(part.diagnostics.into_iter().map(|mut d| {
                d.position += offset;
                d
            }));

        let s = part.summary;
        merged.summary.input += s.input;
        merged.summary.out_of_envelope += s.out_of_envelope;
        merged.summary.out_of_range += s.out_of_range;
        merged.summary.all_missing += s.all_missing;
        merged.summary.repaired += s.repaired;
        merged.summary.interpolated += s.interpolated;
    }

    Ok(merged)
}

/// Interpolate several grids (e.g. different variables on the same lattice)
/// at the same query batch, in parallel
pub fn interpolate_many(
    grids: &[Grid],
    queries: &[QueryPoint],
    options: &InterpolationOptions,
) -> Result<Vec<InterpolationOutput>> {
    grids
        .par_iter()
        .map(|grid| interpolate(grid, queries, options))
        .collect()
}
