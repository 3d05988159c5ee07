//! Interpolation results, per-point diagnostics and their serialization.
//!
//! Results can be written as JSON (one object per point, missing values as
//! `null`) or as an Apache Arrow IPC stream with one row per point.

use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::record_batch::RecordBatch;
use arrow_ipc::writer::StreamWriter;
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TrilerpError};
use crate::query::QueryPoint;

/// The interpolated value at one query point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolatedPoint {
    pub id: String,
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    /// `None` when every surrounding grid sample was missing
    pub value: Option<f64>,
}

impl InterpolatedPoint {
    pub fn from_query(query: &QueryPoint, value: Option<f64>) -> Self {
        Self {
            id: query.id.clone(),
            time: query.time,
            lat: query.lat,
            lon: query.lon,
            value,
        }
    }
}

/// Why a point has no (or no usable) value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointIssue {
    /// The bracketing neighbour on `axis` lies outside the grid
    OutOfRange {
        axis: String,
        index: isize,
        len: usize,
    },
    /// All eight surrounding samples were missing
    AllMissing,
}

/// A per-point problem, reported alongside the results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointDiagnostic {
    /// Position of the point in the input batch
    pub position: usize,
    pub id: String,
    pub issue: PointIssue,
}

/// Point accounting for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Points handed in
    pub input: usize,
    /// Points dropped by the bounds filter
    pub out_of_envelope: usize,
    /// Points dropped because a bracketing index fell outside an axis
    pub out_of_range: usize,
    /// Points kept in the output without a value
    pub all_missing: usize,
    /// Points whose value used at least one mean-filled corner
    pub repaired: usize,
    /// Points present in the output, including those without a value
    pub interpolated: usize,
}

impl BatchSummary {
    /// Points absent from the output
    pub fn excluded(&self) -> usize {
        self.out_of_envelope + self.out_of_range
    }
}

/// Everything an interpolation run produces
#[derive(Debug, Clone, Default, Serialize)]
pub struct InterpolationOutput {
    /// Name of the interpolated variable
    pub variable: String,
    /// One entry per surviving point, in input order
    pub results: Vec<InterpolatedPoint>,
    /// Per-point problems, in input order
    pub diagnostics: Vec<PointDiagnostic>,
    pub summary: BatchSummary,
}

impl InterpolationOutput {
    /// Values in result order; `None` for points without a value
    pub fn values(&self) -> Vec<Option<f64>> {
        self.results.iter().map(|r| r.value).collect()
    }

    /// Identifiers in result order
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.id.as_str()).collect()
    }

    /// Write results, diagnostics and summary as pretty JSON
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Encode the results as an Arrow record batch.
    ///
    /// Columns: `id`, `time` (UTC milliseconds), `lat`, `lon` and the variable
    /// itself, which is nullable.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "time",
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                false,
            ),
            Field::new("lat", DataType::Float64, false),
            Field::new("lon", DataType::Float64, false),
            Field::new(&self.variable, DataType::Float64, true),
        ]));

        let ids = StringArray::from_iter_values(self.results.iter().map(|r| r.id.as_str()));
        let times = TimestampMillisecondArray::from(
            self.results
                .iter()
                .map(|r| r.time.timestamp_millis())
                .collect::<Vec<_>>(),
        )
        .with_timezone("UTC");
        let lats = Float64Array::from_iter_values(self.results.iter().map(|r| r.lat));
        let lons = Float64Array::from_iter_values(self.results.iter().map(|r| r.lon));
        let values = Float64Array::from(self.values());

        let columns: Vec<ArrayRef> = vec![
            Arc::new(ids),
            Arc::new(times),
            Arc::new(lats),
            Arc::new(lons),
            Arc::new(values),
        ];

        RecordBatch::try_new(schema, columns).map_err(|e| TrilerpError::Conversion {
            message: format!("Failed to create Arrow record batch: {}", e),
        })
    }

    /// Write the results as an Arrow IPC stream
    pub fn write_arrow<W: Write>(&self, writer: W) -> Result<()> {
        let batch = self.to_record_batch()?;
        debug!(
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "Writing Arrow IPC stream"
        );

        let mut writer =
            StreamWriter::try_new(writer, &batch.schema()).map_err(|e| {
                TrilerpError::Conversion {
                    message: format!("Failed to create Arrow IPC writer: {}", e),
                }
            })?;

        writer.write(&batch).map_err(|e| TrilerpError::Conversion {
            message: format!("Failed to write Arrow record batch: {}", e),
        })?;

        writer.finish().map_err(|e| TrilerpError::Conversion {
            message: format!("Failed to finalize Arrow IPC stream: {}", e),
        })?;

        Ok(())
    }
}
