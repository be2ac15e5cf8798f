//! Small NetCDF granules written with libnetcdf.
//!
//! Layout matches [`crate::daily_dataset`]: `time(time)` in
//! `days since 2023-01-01`, `lat(lat)`, `lon(lon)` and `var(time, lat, lon)`
//! holding `time * 1_000_000 + create_test_grid(lon, lat)`.

use std::error::Error;
use std::path::Path;

use crate::generators::create_test_grid;

/// `units` of the time axis in written granules.
pub const GRANULE_TIME_UNITS: &str = "days since 2023-01-01 00:00:00";

/// Epoch seconds of 2023-01-01T00:00:00Z.
pub const GRANULE_EPOCH_BASE: f64 = 1_672_531_200.0;

/// Write a one-day granule to `path`.
pub fn write_netcdf_granule(
    path: &Path,
    day: f64,
    lats: &[f64],
    lons: &[f64],
    var: &str,
) -> Result<(), Box<dyn Error>> {
    let mut file = netcdf::create(path)?;
    file.add_attribute("title", "synthetic granule")?;

    file.add_dimension("time", 1)?;
    file.add_dimension("lat", lats.len())?;
    file.add_dimension("lon", lons.len())?;

    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("units", GRANULE_TIME_UNITS)?;
        time.put_values(&[day], ..)?;
    }
    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put_values(lats, ..)?;
    }
    {
        let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_values(lons, ..)?;
    }
    {
        let values: Vec<f64> = create_test_grid(lons.len(), lats.len())
            .into_iter()
            .map(|v| day * 1_000_000.0 + v)
            .collect();
        let mut data = file.add_variable::<f64>(var, &["time", "lat", "lon"])?;
        data.put_attribute("units", "K")?;
        data.put_values(&values, ..)?;
    }

    Ok(())
}

/// The bytes of a granule written by [`write_netcdf_granule`].
pub fn netcdf_granule_bytes(
    day: f64,
    lats: &[f64],
    lons: &[f64],
    var: &str,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("granule.nc");
    write_netcdf_granule(&path, day, lats, lons, var)?;
    Ok(std::fs::read(&path)?)
}
