//! Test data generation utilities.
//!
//! Grids mirror a small tile of a 9-day ocean-colour composite: three time
//! steps 9 days apart, a descending latitude axis and an ascending longitude
//! axis, with coordinates stored at single precision.

use chrono::{DateTime, TimeZone, Utc};
use ndarray::Array3;
use trilerp::{Grid, QueryPoint};

/// Latitudes of the composite tile, north to south (f32 precision)
pub const TILE_LAT: [f32; 3] = [5.375, 5.29166174, 5.20833349];

/// Longitudes of the composite tile, west to east (f32 precision)
pub const TILE_LON: [f32; 3] = [74.625, 74.70833588, 74.79166412];

/// Composite start dates
pub fn tile_times() -> Vec<DateTime<Utc>> {
    vec![
        Utc.with_ymd_and_hms(2002, 7, 13, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2002, 7, 22, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2002, 7, 31, 0, 0, 0).unwrap(),
    ]
}

/// Chlorophyll-like values; every node is distinct
pub fn tile_values() -> Array3<f32> {
    Array3::from_shape_fn((3, 3, 3), |(t, y, x)| {
        0.15 + 0.01 * t as f32 + 0.003 * y as f32 + 0.0007 * x as f32
    })
}

/// The composite tile as a grid
pub fn tile_grid() -> Grid {
    Grid::from_timestamps(
        "chlor_a",
        &tile_times(),
        TILE_LAT.iter().map(|&v| v as f64).collect(),
        TILE_LON.iter().map(|&v| v as f64).collect(),
        tile_values(),
    )
    .unwrap()
}

/// The same tile with the latitude axis stored south to north
pub fn tile_grid_ascending_lat() -> Grid {
    let mut lat: Vec<f64> = TILE_LAT.iter().map(|&v| v as f64).collect();
    lat.reverse();

    let mut values = tile_values();
    values.invert_axis(ndarray::Axis(1));

    Grid::from_timestamps(
        "chlor_a",
        &tile_times(),
        lat,
        TILE_LON.iter().map(|&v| v as f64).collect(),
        values.as_standard_layout().into_owned(),
    )
    .unwrap()
}

/// A grid whose values are an affine function of the coordinates,
/// which trilinear interpolation reproduces exactly
pub fn affine_grid(descending_lat: bool) -> Grid {
    let time = vec![0.0, 9.0, 18.0, 27.0];
    let mut lat = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
    if descending_lat {
        lat.reverse();
    }
    let lon = vec![100.0, 100.5, 101.0, 101.5];

    let values = Array3::from_shape_fn((time.len(), lat.len(), lon.len()), |(t, y, x)| {
        affine(time[t], lat[y], lon[x]) as f32
    });

    Grid::new("affine", time, lat, lon, values).unwrap()
}

/// The function sampled by [`affine_grid`]
pub fn affine(day: f64, lat: f64, lon: f64) -> f64 {
    1.0 + 0.125 * day + 2.0 * lat - 4.0 * (lon - 100.0)
}

/// Timestamp at a fractional day since the Unix epoch
pub fn at_day(day: f64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt((day * 86_400_000.0).round() as i64)
        .unwrap()
}

/// A deterministic batch of points spread through the interior of [`affine_grid`]
pub fn affine_queries(count: usize) -> Vec<QueryPoint> {
    (0..count)
        .map(|i| {
            // golden-ratio sequences give well spread, reproducible fractions
            let a = (i as f64 * 0.618_033_988_75).fract();
            let b = (i as f64 * 0.754_877_666_25).fract();
            let c = (i as f64 * 0.569_840_290_99).fract();
            QueryPoint::new(
                format!("q{}", i),
                at_day(0.5 + 26.0 * a),
                -1.95 + 3.9 * b,
                100.02 + 1.46 * c,
            )
        })
        .collect()
}

/// Write the composite tile to a NetCDF file in CF layout
#[cfg(feature = "netcdf")]
pub fn create_tile_nc(path: &std::path::Path) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("time", 3)?;
    file.add_dimension("lat", 3)?;
    file.add_dimension("lon", 3)?;

    file.add_attribute("title", "9-day chlorophyll composite tile")?;
    file.add_attribute("institution", "trilerp test suite")?;

    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("units", "hours since 2002-07-13 00:00:00")?;
        let time_values: Vec<f64> = vec![0.0, 216.0, 432.0];
        time_var.put_values(&time_values, &[..])?;
    }
    {
        let mut lat_var = file.add_variable::<f32>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_values(&TILE_LAT.to_vec(), &[..])?;
    }
    {
        let mut lon_var = file.add_variable::<f32>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_values(&TILE_LON.to_vec(), &[..])?;
    }
    {
        let mut data_var = file.add_variable::<f32>("chlor_a", &["time", "lat", "lon"])?;
        data_var.put_attribute("units", "mg m^-3")?;
        data_var.put_attribute("_FillValue", -32767.0f32)?;
        let mut values = tile_values();
        values[[2, 1, 1]] = -32767.0;
        let flat: Vec<f32> = values.iter().copied().collect();
        data_var.put_values(&flat, &[.., .., ..])?;
    }

    Ok(())
}
