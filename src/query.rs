//! Query points and their loading.
//!
//! A query batch is an ordered list of `(id, time, lat, lon)` records. The
//! interpolation core expects these four fields to be clean; use
//! [`drop_incomplete`] before handing a batch over if the source may contain
//! gaps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Result, TrilerpError};

/// A location in space-time at which the field should be interpolated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    /// Caller-side identifier, carried through to the output
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Observation time
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub time: DateTime<Utc>,
    /// Latitude in degrees north
    pub lat: f64,
    /// Longitude in degrees east
    pub lon: f64,
}

impl QueryPoint {
    pub fn new(id: impl Into<String>, time: DateTime<Utc>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            time,
            lat,
            lon,
        }
    }

    /// True when the identifier is non-empty and both coordinates are finite
    pub fn is_clean(&self) -> bool {
        !self.id.is_empty() && self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Remove points with an empty id or non-finite coordinates, keeping order.
///
/// Returns the number of dropped points.
pub fn drop_incomplete(points: &mut Vec<QueryPoint>) -> usize {
    let before = points.len();
    points.retain(QueryPoint::is_clean);
    let dropped = before - points.len();
    if dropped > 0 {
        warn!(dropped = dropped, "Dropped incomplete query points");
    }
    dropped
}

/// Load a JSON array of query points from a file
pub fn load_queries(path: &Path) -> Result<Vec<QueryPoint>> {
    if !path.exists() {
        return Err(TrilerpError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let points = parse_queries(&content)?;
    info!(
        file_path = %path.display(),
        count = points.len(),
        "Loaded query points"
    );
    Ok(points)
}

/// Parse a JSON array of query points
pub fn parse_queries(json: &str) -> Result<Vec<QueryPoint>> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a timestamp given as RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` or a bare date (midnight UTC)
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(TrilerpError::InvalidQuery {
        message: format!("Unrecognized timestamp: {}", text),
    })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text).map_err(serde::de::Error::custom)
}

/// Identifiers often arrive as numbers (float ids from tabular sources)
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Integer(i) => i.to_string(),
        RawId::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        RawId::Float(f) => f.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2002, 7, 13, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2002-07-13").unwrap(), expected);
        assert_eq!(parse_timestamp("2002-07-13 00:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2002-07-13T00:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2002-07-13T00:00:00Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2002-07-13T02:00:00+02:00").unwrap(),
            expected
        );
        assert!(parse_timestamp("13/07/2002").is_err());
    }

    #[test]
    fn test_parse_queries_with_numeric_ids() {
        let json = r#"[
            {"id": 10206, "time": "2002-07-13 00:00:00", "lat": 5.20833349228, "lon": 74.7083358765},
            {"id": "float-7", "time": "2002-07-22", "lat": 5.29166173935, "lon": 74.6250076294},
            {"id": 10207.0, "time": "2002-07-13T00:00:00Z", "lat": 5.2, "lon": 74.7}
        ]"#;
        let points = parse_queries(json).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].id, "10206");
        assert_eq!(points[1].id, "float-7");
        assert_eq!(points[2].id, "10207");
        assert_eq!(
            points[1].time,
            Utc.with_ymd_and_hms(2002, 7, 22, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_queries_rejects_bad_time() {
        let json = r#"[{"id": 1, "time": "yesterday", "lat": 0.0, "lon": 0.0}]"#;
        assert!(matches!(
            parse_queries(json),
            Err(TrilerpError::Json(_))
        ));
    }

    #[test]
    fn test_drop_incomplete() {
        let t = Utc.with_ymd_and_hms(2002, 7, 13, 0, 0, 0).unwrap();
        let mut points = vec![
            QueryPoint::new("a", t, 1.0, 2.0),
            QueryPoint::new("b", t, f64::NAN, 2.0),
            QueryPoint::new("", t, 1.0, 2.0),
            QueryPoint::new("d", t, 1.0, 2.0),
        ];
        assert_eq!(drop_incomplete(&mut points), 2);
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn test_load_queries_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "x", "time": "2002-07-13", "lat": 5.3, "lon": 74.7}}]"#
        )
        .unwrap();
        let points = load_queries(file.path()).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, "x");

        let missing = load_queries(Path::new("/nonexistent/queries.json"));
        assert!(matches!(missing, Err(TrilerpError::Io(_))));
    }
}
