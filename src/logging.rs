//! Logging utilities for trilerp.
//!
//! This module provides structured logging functionality so that batch runs
//! leave searchable, analyzable records: what was loaded, how many points were
//! interpolated or excluded, and why individual points failed.

use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::TrilerpError;
use crate::grid::{timestamp_from_days, Grid};
use crate::output::{BatchSummary, PointDiagnostic, PointIssue};

/// Initialize the tracing subscriber with the given log level
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    if let Some(details) = details {
        info!(
            operation = operation,
            details = details,
            "Starting operation"
        );
    } else {
        info!(operation = operation, "Starting operation");
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration = start_time.elapsed();
    let duration_ms = duration.as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed with warnings"
        );
    }
}

/// Log an operation with timing and result in a single statement
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let run_id = generate_run_id();

    debug!(
        operation = operation,
        run_id = %run_id,
        "Starting operation"
    );

    let result = f();

    let duration = start.elapsed();

    info!(
        operation = operation,
        run_id = %run_id,
        duration_ms = duration.as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log detailed information about a loaded grid
pub fn log_grid_load_stats(file_path: &str, grid: &Grid) {
    let shape = grid.values().shape();
    let memory_usage = grid.values().len() * std::mem::size_of::<f32>();
    let (first_day, last_day) = grid.time().range();

    info!(
        operation = "grid_load",
        file_path = file_path,
        variable = grid.variable(),
        shape = ?shape,
        time_start = ?timestamp_from_days(first_day),
        time_end = ?timestamp_from_days(last_day),
        lat_direction = ?grid.lat().direction(),
        lon_direction = ?grid.lon().direction(),
        missing = grid.missing_count(),
        memory_mb = memory_usage / (1024 * 1024),
        "Grid loaded successfully"
    );
}

/// Log the point accounting of a finished batch
pub fn log_batch_summary(variable: &str, summary: &BatchSummary) {
    info!(
        operation = "interpolate",
        variable = variable,
        input = summary.input,
        interpolated = summary.interpolated,
        excluded = summary.excluded(),
        out_of_envelope = summary.out_of_envelope,
        out_of_range = summary.out_of_range,
        all_missing = summary.all_missing,
        repaired = summary.repaired,
        "Batch interpolated"
    );
}

/// Log every per-point diagnostic at WARN level
pub fn log_diagnostics(diagnostics: &[PointDiagnostic]) {
    for diagnostic in diagnostics {
        match &diagnostic.issue {
            PointIssue::OutOfRange { axis, index, len } => warn!(
                id = %diagnostic.id,
                position = diagnostic.position,
                axis = %axis,
                index = index,
                len = len,
                "Point skipped: bracketing index outside the grid"
            ),
            PointIssue::AllMissing => warn!(
                id = %diagnostic.id,
                position = diagnostic.position,
                "Point has no value: all surrounding samples are missing"
            ),
        }
    }
}

/// Log an error with context
pub fn log_error(error: &TrilerpError, context: &str) {
    error!(
        error = %error,
        context = context,
        error_type = std::any::type_name_of_val(error),
        "Error occurred"
    );
}

/// Generate a unique run ID
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_run_id() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();

        assert!(!id1.is_empty());
        assert_ne!(id1, id2); // IDs should be unique
    }

    #[test]
    fn test_log_timed_operation() {
        // This is more of a functional test to ensure it doesn't panic
        let result = log_timed_operation("test_operation", || {
            // Simulate some work
            std::thread::sleep(Duration::from_millis(1));
            42
        });

        assert_eq!(result, 42);
    }

    #[test]
    fn test_log_diagnostics_handles_all_kinds() {
        log_diagnostics(&[
            PointDiagnostic {
                position: 0,
                id: "a".to_string(),
                issue: PointIssue::OutOfRange {
                    axis: "time".to_string(),
                    index: 3,
                    len: 3,
                },
            },
            PointDiagnostic {
                position: 4,
                id: "b".to_string(),
                issue: PointIssue::AllMissing,
            },
        ]);
    }

    #[test]
    fn test_log_grid_load_stats() {
        let values = ndarray::Array3::from_elem((2, 2, 2), 1.0f32);
        let grid = Grid::new(
            "field",
            vec![11881.0, 11890.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            values,
        )
        .unwrap();
        log_grid_load_stats("memory", &grid);
        log_batch_summary("field", &BatchSummary::default());
    }
}
