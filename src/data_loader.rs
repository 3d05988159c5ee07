//! NetCDF grid loading.
//!
//! Reads one variable and its time/lat/lon coordinate variables from a NetCDF
//! file into a [`Grid`]. Packed data is unpacked (`scale_factor`,
//! `add_offset`) and fill values become `NaN`. CF time coordinates
//! (`<unit> since <origin>`) are converted to days since the Unix epoch.

use ndarray::{Array, Array3, Ix3, IxDyn};
use netcdf::{AttributeValue as NcAttributeValue, Variable as NetCDFVariable};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::DataConfig;
use crate::error::{Result, TrilerpError};
use crate::grid::{days_since_epoch, Axis, Grid, SPATIAL_TOLERANCE, TIME_TOLERANCE};
use crate::logging::log_grid_load_stats;
use crate::query::parse_timestamp;

const LAT_FALLBACKS: &[&str] = &["lat", "latitude", "y"];
const LON_FALLBACKS: &[&str] = &["lon", "longitude", "x"];
const TIME_FALLBACKS: &[&str] = &["time", "t"];

/// Load the configured variable of a NetCDF file as a grid
pub fn load_grid(path: &Path, config: &DataConfig) -> Result<Grid> {
    // Check if the file exists
    if !path.exists() {
        return Err(TrilerpError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let file = netcdf::open(path)?;
    info!("Opened NetCDF file: {}", path.display());
    debug!("File has {} variables", file.variables().count());

    let time_var = find_coordinate(&file, &config.time_name, TIME_FALLBACKS)?;
    let lat_var = find_coordinate(&file, &config.lat_name, LAT_FALLBACKS)?;
    let lon_var = find_coordinate(&file, &config.lon_name, LON_FALLBACKS)?;

    let time_units = match &config.time_units {
        Some(units) => Some(units.clone()),
        None => attribute_text(&time_var, "units")?,
    };
    let raw_time = read_coordinate(&time_var)?;
    let time = match time_units {
        Some(units) => convert_time(&raw_time, &units)?,
        None => {
            warn!(
                "Time coordinate {} has no units, assuming days since 1970-01-01",
                time_var.name()
            );
            raw_time
        }
    };

    let time_axis = Axis::new(time_var.name(), time)?.with_tolerance(TIME_TOLERANCE);
    let lat_axis = Axis::new(lat_var.name(), read_coordinate(&lat_var)?)?
        .with_tolerance(SPATIAL_TOLERANCE);
    let lon_axis = Axis::new(lon_var.name(), read_coordinate(&lon_var)?)?
        .with_tolerance(SPATIAL_TOLERANCE);

    let field_var = file
        .variable(&config.variable)
        .ok_or_else(|| TrilerpError::DataNotFound {
            message: format!("Variable not found: {}", config.variable),
        })?;
    let order = [
        coordinate_dimension(&time_var)?,
        coordinate_dimension(&lat_var)?,
        coordinate_dimension(&lon_var)?,
    ];
    let values = read_field(&field_var, &order)?;

    let grid = Grid::from_axes(&config.variable, time_axis, lat_axis, lon_axis, values)?;
    log_grid_load_stats(&path.display().to_string(), &grid);
    Ok(grid)
}

/// Find a coordinate variable by its configured name, then by common aliases
fn find_coordinate<'f>(
    file: &'f netcdf::File,
    preferred: &str,
    fallbacks: &[&str],
) -> Result<NetCDFVariable<'f>> {
    if let Some(var) = file.variable(preferred) {
        return Ok(var);
    }

    for name in fallbacks {
        if let Some(var) = file.variable(name) {
            debug!("Using {} as coordinate variable for {}", name, preferred);
            return Ok(var);
        }
    }

    Err(TrilerpError::DataNotFound {
        message: format!(
            "Coordinate variable not found: {} (also tried {})",
            preferred,
            fallbacks.join(", ")
        ),
    })
}

/// Name of the single dimension a coordinate variable is defined on
fn coordinate_dimension(var: &NetCDFVariable) -> Result<String> {
    match var.dimensions() {
        [dim] => Ok(dim.name()),
        dims => Err(TrilerpError::InvalidGrid {
            message: format!(
                "Coordinate variable {} must be 1-dimensional, has {} dimensions",
                var.name(),
                dims.len()
            ),
        }),
    }
}

/// Read a 1-D coordinate variable as f64
fn read_coordinate(var: &NetCDFVariable) -> Result<Vec<f64>> {
    coordinate_dimension(var)?;
    Ok(var.get_values::<f64, _>(..)?)
}

/// Read the field as (time, lat, lon), reordering dimensions if needed
fn read_field(var: &NetCDFVariable, order: &[String; 3]) -> Result<Array3<f32>> {
    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    if dims.len() != 3 {
        return Err(TrilerpError::InvalidGrid {
            message: format!(
                "Variable {} must have 3 dimensions (time, lat, lon), has {:?}",
                var.name(),
                dims
            ),
        });
    }

    let mut permutation = [0usize; 3];
    for (slot, wanted) in permutation.iter_mut().zip(order) {
        *slot = dims.iter().position(|d| d == wanted).ok_or_else(|| {
            TrilerpError::InvalidGrid {
                message: format!(
                    "Variable {} is not defined on dimension {} (has {:?})",
                    var.name(),
                    wanted,
                    dims
                ),
            }
        })?;
    }

    let raw: Vec<f32> = var.get_values::<f32, _>(..)?;
    let array = Array::from_shape_vec(IxDyn(&shape), raw)?.into_dimensionality::<Ix3>()?;
    let mut values = array
        .permuted_axes(permutation)
        .as_standard_layout()
        .into_owned();

    let fills: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| attribute_number(var, name).transpose())
        .collect::<Result<_>>()?;
    let scale = attribute_number(var, "scale_factor")?.unwrap_or(1.0);
    let offset = attribute_number(var, "add_offset")?.unwrap_or(0.0);

    if !fills.is_empty() || scale != 1.0 || offset != 0.0 {
        debug!(
            variable = %var.name(),
            fills = ?fills,
            scale = scale,
            offset = offset,
            "Unpacking variable"
        );
    }

    values.mapv_inplace(|v| {
        if v.is_nan() || fills.iter().any(|&f| v == f as f32) {
            f32::NAN
        } else {
            (v as f64 * scale + offset) as f32
        }
    });

    Ok(values)
}

/// Convert CF time values (`<unit> since <origin>`) to days since the Unix epoch
pub fn convert_time(values: &[f64], units: &str) -> Result<Vec<f64>> {
    let (unit, origin) = units
        .split_once(" since ")
        .ok_or_else(|| TrilerpError::InvalidGrid {
            message: format!("Unsupported time units: {}", units),
        })?;

    let units_per_day = match unit.trim().to_lowercase().as_str() {
        "days" | "day" | "d" => 1.0,
        "hours" | "hour" | "hrs" | "h" => 24.0,
        "minutes" | "minute" | "mins" | "min" => 1_440.0,
        "seconds" | "second" | "secs" | "sec" | "s" => 86_400.0,
        other => {
            return Err(TrilerpError::InvalidGrid {
                message: format!("Unsupported time unit: {}", other),
            })
        }
    };

    let origin = parse_timestamp(origin.trim().trim_end_matches(" UTC")).map_err(|_| {
        TrilerpError::InvalidGrid {
            message: format!("Unsupported time origin in units: {}", units),
        }
    })?;
    let origin_days = days_since_epoch(&origin);

    Ok(values
        .iter()
        .map(|v| origin_days + v / units_per_day)
        .collect())
}

/// Numeric attribute as f64; arrays yield their first element
fn attribute_number(var: &NetCDFVariable, name: &str) -> Result<Option<f64>> {
    let Some(attr) = var.attribute(name) else {
        return Ok(None);
    };

    let value = match attr.value()? {
        NcAttributeValue::Uchar(v) => Some(v as f64),
        NcAttributeValue::Schar(v) => Some(v as f64),
        NcAttributeValue::Short(v) => Some(v as f64),
        NcAttributeValue::Ushort(v) => Some(v as f64),
        NcAttributeValue::Int(v) => Some(v as f64),
        NcAttributeValue::Uint(v) => Some(v as f64),
        NcAttributeValue::Float(v) => Some(v as f64),
        NcAttributeValue::Double(v) => Some(v),
        NcAttributeValue::Shorts(v) => v.first().map(|&x| x as f64),
        NcAttributeValue::Ints(v) => v.first().map(|&x| x as f64),
        NcAttributeValue::Floats(v) => v.first().map(|&x| x as f64),
        NcAttributeValue::Doubles(v) => v.first().copied(),
        other => {
            warn!(
                "Ignoring non-numeric attribute {} on {}: {:?}",
                name,
                var.name(),
                other
            );
            None
        }
    };
    Ok(value)
}

/// Text attribute, `None` if absent or not text
fn attribute_text(var: &NetCDFVariable, name: &str) -> Result<Option<String>> {
    let Some(attr) = var.attribute(name) else {
        return Ok(None);
    };

    match attr.value()? {
        NcAttributeValue::Str(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Create a test NetCDF file with sample data for testing
#[cfg(test)]
fn create_test_netcdf_file(path: &Path) -> Result<()> {
    create_named_netcdf_file(path, "lat", "lon")
}

/// Test file whose lat/lon coordinate variables may be named apart from
/// their dimensions
#[cfg(test)]
fn create_named_netcdf_file(path: &Path, lat_name: &str, lon_name: &str) -> Result<()> {
    let mut file = netcdf::create(path)?;

    // Dimensions in (time, lat, lon) order except for lon/lat swapped on the field
    file.add_dimension("time", 3)?;
    file.add_dimension("lat", 3)?;
    file.add_dimension("lon", 4)?;

    file.add_attribute("title", "trilerp test file")?;

    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("units", "days since 2002-07-13")?;
        let time_values: Vec<f64> = vec![0.0, 9.0, 18.0];
        time_var.put_values(&time_values, &[..])?;
    }
    {
        let mut lat_var = file.add_variable::<f32>(lat_name, &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        let lat_values: Vec<f32> = vec![5.375, 5.29166174, 5.20833349];
        lat_var.put_values(&lat_values, &[..])?;
    }
    {
        let mut lon_var = file.add_variable::<f32>(lon_name, &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        let lon_values: Vec<f32> = vec![74.625, 74.70833588, 74.79166412, 74.875];
        lon_var.put_values(&lon_values, &[..])?;
    }
    {
        // Stored as (time, lon, lat) to exercise reordering
        let mut field = file.add_variable::<f32>("chlor_a", &["time", "lon", "lat"])?;
        field.put_attribute("_FillValue", -32767.0f32)?;
        field.put_attribute("scale_factor", 0.5f32)?;
        let data: Vec<f32> = (0..36)
            .map(|i| if i == 5 { -32767.0 } else { i as f32 })
            .collect();
        field.put_values(&data, &[.., .., ..])?;
    }

    Ok(())
}
