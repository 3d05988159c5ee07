//! The gridded field that query points are interpolated against.
//!
//! A [`Grid`] holds one named scalar variable sampled on a regular
//! time × latitude × longitude lattice. Each dimension is described by an
//! [`Axis`], which validates its coordinates once at construction time and
//! records whether they run upwards or downwards. The interpolation code never
//! assumes a direction; it asks the axis.

use chrono::{DateTime, TimeZone, Utc};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrilerpError};
use crate::interpolation::bounds::Envelope;

/// Bracketing tolerance used for the latitude and longitude axes.
///
/// Coordinates usually come from single precision files, so a query that sits
/// on a node may differ from it by round-off of this order.
pub const SPATIAL_TOLERANCE: f64 = f32::EPSILON as f64;

/// Bracketing tolerance used for the time axis.
pub const TIME_TOLERANCE: f64 = 0.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Ordering of an axis' coordinate array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Coordinates increase with the index
    Ascending,
    /// Coordinates decrease with the index
    Descending,
}

impl Direction {
    /// +1 for ascending axes, -1 for descending ones.
    ///
    /// Multiplying a coordinate difference by this sign expresses it along
    /// the direction of increasing index.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Ascending => 1.0,
            Direction::Descending => -1.0,
        }
    }
}

/// A validated, strictly monotonic coordinate array
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    name: String,
    coords: Vec<f64>,
    direction: Direction,
    tolerance: f64,
}

impl Axis {
    /// Build an axis, detecting its direction from the coordinates.
    ///
    /// Fails with [`TrilerpError::DegenerateAxis`] when two neighbouring
    /// coordinates are equal and with [`TrilerpError::InvalidGrid`] when the
    /// array is too short, contains non-finite values or changes direction.
    pub fn new(name: impl Into<String>, coords: Vec<f64>) -> Result<Self> {
        let name = name.into();

        if coords.len() < 2 {
            return Err(TrilerpError::InvalidGrid {
                message: format!(
                    "Axis {} needs at least 2 coordinates, got {}",
                    name,
                    coords.len()
                ),
            });
        }

        if let Some(i) = coords.iter().position(|c| !c.is_finite()) {
            return Err(TrilerpError::InvalidGrid {
                message: format!("Axis {} has a non-finite coordinate at index {}", name, i),
            });
        }

        let direction = if coords[1] > coords[0] {
            Direction::Ascending
        } else if coords[1] < coords[0] {
            Direction::Descending
        } else {
            return Err(TrilerpError::DegenerateAxis { axis: name, index: 1 });
        };

        for (i, pair) in coords.windows(2).enumerate() {
            let step = (pair[1] - pair[0]) * direction.sign();
            if step == 0.0 {
                return Err(TrilerpError::DegenerateAxis {
                    axis: name,
                    index: i + 1,
                });
            }
            if step < 0.0 {
                return Err(TrilerpError::InvalidGrid {
                    message: format!(
                        "Axis {} is not monotonic: direction changes at index {}",
                        name,
                        i + 1
                    ),
                });
            }
        }

        Ok(Self {
            name,
            coords,
            direction,
            tolerance: 0.0,
        })
    }

    /// Set the tolerance used when deciding which side of a node a query lies on
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Coordinate at a signed index, `None` outside the axis
    pub fn get(&self, index: isize) -> Option<f64> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.coords.get(i).copied())
    }

    /// Smallest and largest coordinate, independent of direction
    pub fn range(&self) -> (f64, f64) {
        self.coords
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| {
                (lo.min(c), hi.max(c))
            })
    }
}

/// A named scalar field on a time × latitude × longitude lattice.
///
/// Missing samples are stored as `NaN`.
#[derive(Debug, Clone)]
pub struct Grid {
    variable: String,
    time: Axis,
    lat: Axis,
    lon: Axis,
    values: Array3<f32>,
}

impl Grid {
    /// Build a grid from raw coordinate arrays.
    ///
    /// Time coordinates are days since the Unix epoch.
    pub fn new(
        variable: impl Into<String>,
        time: Vec<f64>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        values: Array3<f32>,
    ) -> Result<Self> {
        Self::from_axes(
            variable,
            Axis::new("time", time)?.with_tolerance(TIME_TOLERANCE),
            Axis::new("lat", lat)?.with_tolerance(SPATIAL_TOLERANCE),
            Axis::new("lon", lon)?.with_tolerance(SPATIAL_TOLERANCE),
            values,
        )
    }

    /// Build a grid whose time axis is given as timestamps
    pub fn from_timestamps(
        variable: impl Into<String>,
        times: &[DateTime<Utc>],
        lat: Vec<f64>,
        lon: Vec<f64>,
        values: Array3<f32>,
    ) -> Result<Self> {
        let time = times.iter().map(days_since_epoch).collect();
        Self::new(variable, time, lat, lon, values)
    }

    /// Assemble a grid from prepared axes, checking the value array's shape
    pub fn from_axes(
        variable: impl Into<String>,
        time: Axis,
        lat: Axis,
        lon: Axis,
        values: Array3<f32>,
    ) -> Result<Self> {
        let expected = [time.len(), lat.len(), lon.len()];
        if values.shape() != expected {
            return Err(TrilerpError::InvalidGrid {
                message: format!(
                    "Value array shape {:?} does not match axis lengths (time, lat, lon) = {:?}",
                    values.shape(),
                    expected
                ),
            });
        }

        Ok(Self {
            variable: variable.into(),
            time,
            lat,
            lon,
            values,
        })
    }

    /// Name of the interpolated variable
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn time(&self) -> &Axis {
        &self.time
    }

    pub fn lat(&self) -> &Axis {
        &self.lat
    }

    pub fn lon(&self) -> &Axis {
        &self.lon
    }

    pub fn values(&self) -> &Array3<f32> {
        &self.values
    }

    /// Sample at a (time, lat, lon) index triple, `None` outside the grid
    pub fn value(&self, t: usize, y: usize, x: usize) -> Option<f32> {
        self.values.get([t, y, x]).copied()
    }

    /// Latitude/longitude rectangle spanned by the grid
    pub fn envelope(&self) -> Envelope {
        Envelope::from_axes(&self.lat, &self.lon)
    }

    /// Number of missing samples in the field
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

/// Days since 1970-01-01T00:00:00Z, with fractional days for sub-day times
pub fn days_since_epoch(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / MILLIS_PER_DAY
}

/// Inverse of [`days_since_epoch`], rounded to the millisecond
pub fn timestamp_from_days(days: f64) -> Option<DateTime<Utc>> {
    if !days.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt((days * MILLIS_PER_DAY).round() as i64)
        .single()
}
