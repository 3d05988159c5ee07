//! trilerp - trilinear interpolation of gridded fields at query points
//!
//! This is the main entry point for the trilerp command-line tool.

use anyhow::Context;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Instant;
use tracing::{error, info};

use trilerp::config::OutputFormat;
use trilerp::data_loader::load_grid;
use trilerp::query::{drop_incomplete, load_queries};
use trilerp::{
    init_tracing, interpolate, interpolate_chunked, log_batch_summary, log_diagnostics,
    log_error, log_operation_end, log_operation_start, log_timed_operation, Config,
    InterpolationOptions, TrilerpError,
};

fn main() -> anyhow::Result<()> {
    // Load configuration
    let (config, inputs) = Config::load().context("Failed to load configuration")?;

    // Initialize tracing with the configured level
    init_tracing(&config.log_level);

    info!("Starting trilerp v{}", env!("CARGO_PKG_VERSION"));

    // Validate configuration
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    if let Some(workers) = config.interpolation.workers {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
            .map_err(|e| TrilerpError::Config {
                message: format!("Failed to configure worker threads: {}", e),
            })?;
        info!("Using {} worker threads", workers);
    }

    let start = Instant::now();
    log_operation_start("load_grid", Some(&inputs.grid.display().to_string()));
    let grid = load_grid(&inputs.grid, &config.data).map_err(|e| {
        log_error(&e, "Failed to load grid");
        e
    })?;
    log_operation_end("load_grid", start, true);

    let mut queries = load_queries(&inputs.queries).map_err(|e| {
        log_error(&e, "Failed to load query points");
        e
    })?;
    drop_incomplete(&mut queries);

    let options = InterpolationOptions::from(&config.interpolation);
    let output = log_timed_operation("interpolate", || match config.interpolation.chunk_size {
        Some(chunk_size) => interpolate_chunked(&grid, &queries, chunk_size, &options),
        None => interpolate(&grid, &queries, &options),
    })
    .map_err(|e| {
        log_error(&e, "Interpolation failed");
        e
    })?;

    log_diagnostics(&output.diagnostics);
    log_batch_summary(&output.variable, &output.summary);

    let writer: Box<dyn Write> = match &config.output.path {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);

    match config.output.format {
        OutputFormat::Json => output.write_json(&mut writer)?,
        OutputFormat::Arrow => output.write_arrow(&mut writer)?,
    }
    writer.flush()?;

    info!(
        format = %config.output.format,
        results = output.results.len(),
        "Results written"
    );
    Ok(())
}
