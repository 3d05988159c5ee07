//! Spatial envelope filtering.
//!
//! A point can only be bracketed on an axis if there is a grid node on either
//! side of it, so points on or beyond the lat/lon extremes are dropped before
//! any locating happens. This is a join, not a validation step: excluded
//! points are simply counted. Time is not filtered here.

use serde::Serialize;

use crate::grid::Axis;
use crate::query::QueryPoint;

/// The latitude/longitude rectangle spanned by a grid's coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Envelope {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Envelope {
    /// Compute the envelope from the extremes of two axes, in any direction
    pub fn from_axes(lat: &Axis, lon: &Axis) -> Self {
        let (lat_min, lat_max) = lat.range();
        let (lon_min, lon_max) = lon.range();
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    /// Strict containment; points exactly on the boundary are outside
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.lat_min < lat && lat < self.lat_max && self.lon_min < lon && lon < self.lon_max
    }

    /// Positions of the points inside the envelope, in input order
    pub fn filter(&self, points: &[QueryPoint]) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| self.contains(p.lat, p.lon))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn point(id: &str, lat: f64, lon: f64) -> QueryPoint {
        QueryPoint::new(id, Utc.with_ymd_and_hms(2002, 7, 13, 0, 0, 0).unwrap(), lat, lon)
    }

    fn envelope() -> Envelope {
        let lat = Axis::new("lat", vec![5.375, 5.292, 5.208]).unwrap();
        let lon = Axis::new("lon", vec![74.625, 74.708, 74.792]).unwrap();
        Envelope::from_axes(&lat, &lon)
    }

    #[test]
    fn test_envelope_from_descending_axis() {
        let env = envelope();
        assert_eq!(env.lat_min, 5.208);
        assert_eq!(env.lat_max, 5.375);
        assert_eq!(env.lon_min, 74.625);
        assert_eq!(env.lon_max, 74.792);
    }

    #[test]
    fn test_boundary_points_are_excluded() {
        let env = envelope();
        assert!(env.contains(5.3, 74.7));
        assert!(!env.contains(5.208, 74.7));
        assert!(!env.contains(5.375, 74.7));
        assert!(!env.contains(5.3, 74.625));
        assert!(!env.contains(5.3, 74.792));
    }

    #[test]
    fn test_filter_preserves_order() {
        let env = envelope();
        let points = vec![
            point("a", 5.3, 74.7),
            point("b", 5.3, 80.0),
            point("c", 5.25, 74.65),
            point("d", 5.208, 74.65),
            point("e", 5.36, 74.78),
        ];
        assert_eq!(env.filter(&points), vec![0, 2, 4]);
    }
}
