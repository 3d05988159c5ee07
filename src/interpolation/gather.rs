//! Collecting the eight grid samples around each located point.
//!
//! Corners are numbered by binary counting over (time, lat, lon) with time as
//! the most significant bit, where a 0 bit selects the nearest node and a 1
//! bit selects the next node:
//!
//! | corner | time    | lat     | lon     |
//! |--------|---------|---------|---------|
//! | 0      | nearest | nearest | nearest |
//! | 1      | nearest | nearest | next    |
//! | 2      | nearest | next    | nearest |
//! | 3      | nearest | next    | next    |
//! | 4      | next    | nearest | nearest |
//! | 5      | next    | nearest | next    |
//! | 6      | next    | next    | nearest |
//! | 7      | next    | next    | next    |
//!
//! [`combine`](super::combine) builds its weights in the same order.

use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;

use super::axis::AxisLocation;
use crate::grid::Grid;

/// Number of corners of a grid cell in three dimensions
pub const CORNERS: usize = 8;

/// The bracketing result of one query point on all three axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellLocation {
    pub time: AxisLocation,
    pub lat: AxisLocation,
    pub lon: AxisLocation,
}

impl CellLocation {
    /// (time, lat, lon) indices of one corner
    pub fn corner_index(&self, corner: usize) -> [usize; 3] {
        let pick = |loc: &AxisLocation, bit: usize| {
            if corner & bit == 0 {
                loc.nearest
            } else {
                loc.next
            }
        };
        [
            pick(&self.time, 0b100),
            pick(&self.lat, 0b010),
            pick(&self.lon, 0b001),
        ]
    }

    /// Raw samples at the eight corners; missing data stays `NaN`
    pub fn corner_samples(&self, grid: &Grid) -> [f64; CORNERS] {
        let mut samples = [f64::NAN; CORNERS];
        for (corner, sample) in samples.iter_mut().enumerate() {
            let [t, y, x] = self.corner_index(corner);
            *sample = grid.value(t, y, x).map_or(f64::NAN, f64::from);
        }
        samples
    }
}

/// Gather corner samples for a batch into an 8 × P matrix, one column per point
pub fn gather(grid: &Grid, cells: &[CellLocation], min_len: usize) -> Array2<f64> {
    let columns: Vec<[f64; CORNERS]> = cells
        .par_iter()
        .with_min_len(min_len.max(1))
        .map(|cell| cell.corner_samples(grid))
        .collect();

    Array2::from_shape_fn((CORNERS, columns.len()), |(corner, point)| {
        columns[point][corner]
    })
}
