//! Bracketing a query value on a single axis.
//!
//! For every axis the same procedure applies: find the nearest node, look at
//! which side of it the query lies, and take the neighbouring node on that
//! side as "next". The side is measured along increasing index, so an
//! ascending and a descending axis holding the same coordinates bracket a
//! value identically.
//!
//! The decision uses the axis tolerance: the step goes towards higher indices
//! when `delta * direction.sign() >= tolerance` and towards lower indices
//! otherwise. With a zero tolerance (time) a query sitting exactly on a node
//! therefore brackets forward; with a positive tolerance (lat/lon) it brackets
//! backward. Either way its weight is zero, so the bracket choice only
//! matters for whether the neighbour exists.

use rayon::prelude::*;
use serde::Serialize;

use crate::grid::{Axis, Direction};

/// Where a query value sits between two neighbouring nodes of one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisLocation {
    /// Index of the node closest to the query value
    pub nearest: usize,
    /// Index of the adjacent node on the query's side of `nearest`
    pub next: usize,
    /// Query value minus the nearest coordinate
    pub delta: f64,
    /// Next coordinate minus the nearest coordinate
    pub base: f64,
    /// `delta / base`, the fraction of the cell covered from `nearest`
    pub weight: f64,
}

/// Reasons a value cannot be bracketed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocateError {
    /// The bracketing neighbour lies outside the axis
    OutOfRange { index: isize, len: usize },
    /// Nearest and next share a coordinate
    Degenerate { index: usize },
}

/// Index of the node closest to `value`.
///
/// Exact ties between two nodes resolve to the lower index. Values beyond
/// either end of the axis map to the end node.
pub fn nearest_index(axis: &Axis, value: f64) -> usize {
    let coords = axis.coords();
    let split = match axis.direction() {
        Direction::Ascending => coords.partition_point(|&c| c < value),
        Direction::Descending => coords.partition_point(|&c| c > value),
    };

    if split == 0 {
        return 0;
    }
    if split >= coords.len() {
        return coords.len() - 1;
    }

    let below = split - 1;
    if (value - coords[below]).abs() <= (coords[split] - value).abs() {
        below
    } else {
        split
    }
}

/// Bracket one value on one axis
pub fn locate(axis: &Axis, value: f64) -> Result<AxisLocation, LocateError> {
    let coords = axis.coords();
    let nearest = nearest_index(axis, value);
    let nearest_value = coords[nearest];
    let delta = value - nearest_value;

    let step: isize = if delta * axis.direction().sign() >= axis.tolerance() {
        1
    } else {
        -1
    };
    let next = nearest as isize + step;
    let next_value = axis.get(next).ok_or(LocateError::OutOfRange {
        index: next,
        len: coords.len(),
    })?;

    let next = next as usize;
    let base = next_value - nearest_value;
    if base == 0.0 {
        return Err(LocateError::Degenerate { index: next });
    }

    Ok(AxisLocation {
        nearest,
        next,
        delta,
        base,
        weight: delta / base,
    })
}

/// Bracket a whole batch of values on one axis, preserving order
pub fn locate_batch(
    axis: &Axis,
    values: &[f64],
    min_len: usize,
) -> Vec<Result<AxisLocation, LocateError>> {
    values
        .par_iter()
        .with_min_len(min_len.max(1))
        .map(|&v| locate(axis, v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{SPATIAL_TOLERANCE, TIME_TOLERANCE};

    fn time_axis() -> Axis {
        Axis::new("time", vec![0.0, 9.0, 18.0])
            .unwrap()
            .with_tolerance(TIME_TOLERANCE)
    }

    fn lat_desc() -> Axis {
        Axis::new("lat", vec![3.0, 2.0, 1.0, 0.0])
            .unwrap()
            .with_tolerance(SPATIAL_TOLERANCE)
    }

    fn lat_asc() -> Axis {
        Axis::new("lat", vec![0.0, 1.0, 2.0, 3.0])
            .unwrap()
            .with_tolerance(SPATIAL_TOLERANCE)
    }

    #[test]
    fn test_nearest_index_ties_go_low() {
        let axis = lat_asc();
        assert_eq!(nearest_index(&axis, 1.5), 1);
        assert_eq!(nearest_index(&axis, 1.6), 2);
        assert_eq!(nearest_index(&axis, 2.0), 2);
        assert_eq!(nearest_index(&axis, -5.0), 0);
        assert_eq!(nearest_index(&axis, 9.0), 3);

        let axis = lat_desc();
        // 1.5 sits between index 1 (2.0) and index 2 (1.0)
        assert_eq!(nearest_index(&axis, 1.5), 1);
        assert_eq!(nearest_index(&axis, 1.4), 2);
        assert_eq!(nearest_index(&axis, 3.0), 0);
        assert_eq!(nearest_index(&axis, -1.0), 3);
    }

    #[test]
    fn test_time_brackets_forward_on_exact_hit() {
        let loc = locate(&time_axis(), 9.0).unwrap();
        assert_eq!(loc.nearest, 1);
        assert_eq!(loc.next, 2);
        assert_eq!(loc.weight, 0.0);

        let loc = locate(&time_axis(), 6.0).unwrap();
        assert_eq!(loc.nearest, 1);
        assert_eq!(loc.next, 0);
        assert_eq!(loc.delta, -3.0);
        assert_eq!(loc.base, -9.0);
        assert!((loc.weight - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_time_overflow_is_reported() {
        assert_eq!(
            locate(&time_axis(), 18.0),
            Err(LocateError::OutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            locate(&time_axis(), 25.0),
            Err(LocateError::OutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            locate(&time_axis(), -2.0),
            Err(LocateError::OutOfRange { index: -1, len: 3 })
        );
    }

    #[test]
    fn test_spatial_exact_hit_brackets_backward() {
        let loc = locate(&lat_asc(), 2.0).unwrap();
        assert_eq!((loc.nearest, loc.next), (2, 1));
        assert_eq!(loc.weight, 0.0);

        let loc = locate(&lat_desc(), 1.0).unwrap();
        assert_eq!((loc.nearest, loc.next), (2, 1));
        assert_eq!(loc.weight, 0.0);
    }

    #[test]
    fn test_descending_matches_ascending() {
        let asc = lat_asc();
        let desc = lat_desc();
        for &v in &[0.3, 0.7, 1.2, 1.5, 1.9, 2.25, 2.8] {
            let a = locate(&asc, v).unwrap();
            let d = locate(&desc, v).unwrap();

            let a_pair = {
                let mut p = [asc.coords()[a.nearest], asc.coords()[a.next]];
                p.sort_by(f64::total_cmp);
                p
            };
            let d_pair = {
                let mut p = [desc.coords()[d.nearest], desc.coords()[d.next]];
                p.sort_by(f64::total_cmp);
                p
            };
            assert_eq!(a_pair, d_pair, "bracket differs for {}", v);
            assert!(a_pair[0] <= v && v <= a_pair[1]);
            assert!((a.weight - d.weight).abs() < 1e-12);
            assert!((0.0..=1.0).contains(&a.weight));
        }
    }

    #[test]
    fn test_locate_batch_keeps_order() {
        let axis = time_axis();
        let results = locate_batch(&axis, &[1.0, 20.0, 12.0], 1);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].unwrap().nearest, 0);
        assert!(results[1].is_err());
        assert_eq!(results[2].unwrap().nearest, 1);
    }
}
