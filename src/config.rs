//! Configuration management for trilerp.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, TrilerpError};
use crate::interpolation::{InterpolationOptions, OverflowPolicy, TracingHook};

/// Command-line arguments for trilerp
#[derive(Parser, Debug)]
#[command(name = "trilerp")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the NetCDF file holding the gridded field
    pub grid_file: PathBuf,

    /// Path to a JSON array of query points ({id, time, lat, lon})
    pub queries_file: PathBuf,

    /// Name of the variable to interpolate
    #[arg(short, long, env = "TRILERP_VARIABLE")]
    pub variable: Option<String>,

    /// Where to write the results (stdout when omitted)
    #[arg(short, long, env = "TRILERP_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output format (json, arrow)
    #[arg(short, long, env = "TRILERP_FORMAT")]
    pub format: Option<String>,

    /// What to do when a point cannot be bracketed (skip, abort)
    #[arg(long, env = "TRILERP_ON_OUT_OF_RANGE")]
    pub on_out_of_range: Option<String>,

    /// Emit per-point trace events (visible at log level trace)
    #[arg(long, env = "TRILERP_TRACE")]
    pub trace: bool,

    /// Number of worker threads
    #[arg(short, long, env = "TRILERP_WORKERS")]
    pub workers: Option<usize>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "TRILERP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TRILERP_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Output encodings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Arrow,
}

impl FromStr for OutputFormat {
    type Err = TrilerpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "arrow" => Ok(OutputFormat::Arrow),
            _ => Err(TrilerpError::Config {
                message: format!("Invalid output format: {}. Must be one of: json, arrow", s),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Arrow => write!(f, "arrow"),
        }
    }
}

/// Grid source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Variable to interpolate
    #[serde(default = "default_variable")]
    pub variable: String,

    /// Name of the time coordinate variable
    #[serde(default = "default_time_name")]
    pub time_name: String,

    /// Name of the latitude coordinate variable
    #[serde(default = "default_lat_name")]
    pub lat_name: String,

    /// Name of the longitude coordinate variable
    #[serde(default = "default_lon_name")]
    pub lon_name: String,

    /// CF time units overriding the file's `units` attribute
    #[serde(default)]
    pub time_units: Option<String>,
}

/// Interpolation run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Policy for points whose bracketing index leaves the grid
    #[serde(default)]
    pub on_out_of_range: OverflowPolicy,

    /// Emit per-point trace events
    #[serde(default)]
    pub trace: bool,

    /// Smallest number of points per parallel task
    #[serde(default = "default_min_points_per_task")]
    pub min_points_per_task: usize,

    /// Process the batch in chunks of this many points (None = one pass)
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Number of worker threads (None = number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Destination file (None = stdout)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Grid source configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Interpolation configuration
    #[serde(default)]
    pub interpolation: InterpolationConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Input files named on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    pub grid: PathBuf,
    pub queries: PathBuf,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, InputPaths)> {
        Self::from_args(Args::parse())
    }

    /// Build configuration from parsed arguments, reading the config file if named
    pub fn from_args(args: Args) -> Result<(Self, InputPaths)> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if let Some(variable) = args.variable {
            config.data.variable = variable;
        }
        if let Some(path) = args.output {
            config.output.path = Some(path);
        }
        if let Some(format) = args.format {
            config.output.format = format.parse()?;
        }
        if let Some(policy) = args.on_out_of_range {
            config.interpolation.on_out_of_range = policy.parse()?;
        }
        if args.trace {
            config.interpolation.trace = true;
        }
        if args.workers.is_some() {
            config.interpolation.workers = args.workers;
        }
        if let Some(level) = args.log_level {
            config.log_level = level;
        }

        let inputs = InputPaths {
            grid: args.grid_file,
            queries: args.queries_file,
        };

        Ok((config, inputs))
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.data = other.data;
        self.interpolation.on_out_of_range = other.interpolation.on_out_of_range;
        self.interpolation.trace = other.interpolation.trace;
        self.interpolation.min_points_per_task = other.interpolation.min_points_per_task;
        if other.interpolation.chunk_size.is_some() {
            self.interpolation.chunk_size = other.interpolation.chunk_size;
        }
        if other.interpolation.workers.is_some() {
            self.interpolation.workers = other.interpolation.workers;
        }
        self.output.format = other.output.format;
        if other.output.path.is_some() {
            self.output.path = other.output.path;
        }
        self.log_level = other.log_level;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("variable", &self.data.variable),
            ("time_name", &self.data.time_name),
            ("lat_name", &self.data.lat_name),
            ("lon_name", &self.data.lon_name),
        ] {
            if value.trim().is_empty() {
                return Err(TrilerpError::Config {
                    message: format!("Data field {} cannot be empty", field),
                });
            }
        }

        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(TrilerpError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        if self.interpolation.min_points_per_task == 0 {
            return Err(TrilerpError::Config {
                message: "min_points_per_task must be at least 1".to_string(),
            });
        }

        if self.interpolation.chunk_size == Some(0) {
            return Err(TrilerpError::Config {
                message: "chunk_size must be at least 1".to_string(),
            });
        }

        if self.interpolation.workers == Some(0) {
            return Err(TrilerpError::Config {
                message: "workers must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

impl From<&InterpolationConfig> for InterpolationOptions {
    fn from(config: &InterpolationConfig) -> Self {
        let options = InterpolationOptions {
            overflow_policy: config.on_out_of_range,
            min_points_per_task: config.min_points_per_task,
            trace: None,
        };
        if config.trace {
            options.with_trace(Arc::new(TracingHook))
        } else {
            options
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            interpolation: InterpolationConfig::default(),
            output: OutputConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            variable: default_variable(),
            time_name: default_time_name(),
            lat_name: default_lat_name(),
            lon_name: default_lon_name(),
            time_units: None,
        }
    }
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            on_out_of_range: OverflowPolicy::default(),
            trace: false,
            min_points_per_task: default_min_points_per_task(),
            chunk_size: None,
            workers: None,
        }
    }
}

// Default value functions for serde
fn default_variable() -> String {
    "chlor_a".to_string()
}

fn default_time_name() -> String {
    "time".to_string()
}

fn default_lat_name() -> String {
    "lat".to_string()
}

fn default_lon_name() -> String {
    "lon".to_string()
}

fn default_min_points_per_task() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}
