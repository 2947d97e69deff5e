//! Loading gridded precipitation granules.
//!
//! Granules are IMERG HDF5 files read through netCDF-4. All granules of a
//! collection share one longitude/latitude grid, which is read once per run
//! from the first file and validated against every later file.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDate;
use netcdf::{AttributeValue, Variable};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    basin::Crs,
    error::{Error, Result},
};

/// Where the precipitation field and its coordinates live inside a granule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GranuleLayout {
    pub group: String,
    pub variable: String,
    pub lon_variable: String,
    pub lat_variable: String,
    /// Position of the `.`-separated file name field holding the date.
    pub date_field: usize,
}

impl Default for GranuleLayout {
    fn default() -> Self {
        GranuleLayout {
            group: "Grid".to_string(),
            variable: "precipitation".to_string(),
            lon_variable: "lon".to_string(),
            lat_variable: "lat".to_string(),
            date_field: 4,
        }
    }
}

/// Longitude/latitude cell centres shared by every granule of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
}

impl GridSpec {
    /// Establishes the run's grid from one granule.
    pub fn from_granule(path: &Path, layout: &GranuleLayout) -> Result<Self> {
        let file = netcdf::open(path)?;
        let group = file.group(&layout.group)?.ok_or_else(|| Error::MissingGroup {
            path: path.to_path_buf(),
            group: layout.group.clone(),
        })?;

        let read = |name: &str| -> Result<Vec<f64>> {
            let var = group
                .variable(name)
                .ok_or_else(|| Error::MissingVariable {
                    path: path.to_path_buf(),
                    variable: name.to_string(),
                })?;
            Ok(var.get_values::<f64, _>(..)?)
        };

        let grid = GridSpec {
            lon: read(&layout.lon_variable)?,
            lat: read(&layout.lat_variable)?,
        };
        debug!(
            lon = grid.lon.len(),
            lat = grid.lat.len(),
            "grid established from {}",
            path.display()
        );

        Ok(grid)
    }

    pub fn cells(&self) -> usize {
        self.lon.len() * self.lat.len()
    }
}

/// One time step of gridded precipitation rate (mm/hr).
#[derive(Debug, Clone)]
pub struct Granule {
    pub date: NaiveDate,
    pub grid: Arc<GridSpec>,
    pub crs: Crs,
    /// Latitude-major values, `NaN` where missing.
    pub precipitation: Vec<f32>,
}

impl Granule {
    pub fn value(&self, lat_idx: usize, lon_idx: usize) -> f32 {
        self.precipitation[lat_idx * self.grid.lon.len() + lon_idx]
    }
}

/// Parses the `YYYYMMDD` token at the start of file name field `field`.
///
/// `3B-MO.MS.MRG.3IMERG.20200615-S000000-E235959.06.V07B.HDF5` has its date
/// in field 4.
pub fn parse_granule_date(file_name: &str, field: usize) -> Result<NaiveDate> {
    let malformed = || Error::MalformedFileName(file_name.to_string());

    let token = file_name
        .split('.')
        .nth(field)
        .and_then(|part| part.get(0..8))
        .ok_or_else(malformed)?;

    NaiveDate::parse_from_str(token, "%Y%m%d").map_err(|_| malformed())
}

/// Granule files in `dir` with the given extension, sorted by name.
pub fn list_granules(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);

        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AxisOrder {
    LatLon,
    LonLat,
}

/// Reads one granule against the run's established grid.
pub fn load_granule(path: &Path, grid: &Arc<GridSpec>, layout: &GranuleLayout) -> Result<Granule> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let date = parse_granule_date(&file_name, layout.date_field)?;

    let file = netcdf::open(path)?;
    let group = file.group(&layout.group)?.ok_or_else(|| Error::MissingGroup {
        path: path.to_path_buf(),
        group: layout.group.clone(),
    })?;
    let var = group
        .variable(&layout.variable)
        .ok_or_else(|| Error::MissingVariable {
            path: path.to_path_buf(),
            variable: layout.variable.clone(),
        })?;

    let order = axis_order(&var, grid, layout)?;
    let raw: Vec<f32> = var.get_values(..)?;
    let fill = fill_value(&var);

    let n_lon = grid.lon.len();
    let n_lat = grid.lat.len();
    let mut precipitation = vec![f32::NAN; n_lon * n_lat];

    for lat_idx in 0..n_lat {
        for lon_idx in 0..n_lon {
            let src = match order {
                AxisOrder::LatLon => lat_idx * n_lon + lon_idx,
                AxisOrder::LonLat => lon_idx * n_lat + lat_idx,
            };
            let value = raw[src];
            if !is_missing(value, fill) {
                precipitation[lat_idx * n_lon + lon_idx] = value;
            }
        }
    }

    debug!(%date, "loaded granule {}", file_name);

    Ok(Granule {
        date,
        grid: Arc::clone(grid),
        crs: Crs::Wgs84,
        precipitation,
    })
}

// Dimension names decide the order when present; lengths decide otherwise.
fn axis_order(var: &Variable, grid: &GridSpec, layout: &GranuleLayout) -> Result<AxisOrder> {
    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect();

    let spatial: Vec<&(String, usize)> = match dims.len() {
        2 => dims.iter().collect(),
        3 if dims[0].1 == 1 => dims[1..].iter().collect(),
        3 => {
            return Err(Error::InvalidLayout(format!(
                "expected a single time step, found {} in `{}`",
                dims[0].1, layout.variable
            )))
        }
        n => {
            return Err(Error::InvalidLayout(format!(
                "expected 2 or 3 dimensions for `{}`, found {}",
                layout.variable, n
            )))
        }
    };

    let (first, second) = (spatial[0], spatial[1]);
    let order = if first.0 == layout.lat_variable || second.0 == layout.lon_variable {
        AxisOrder::LatLon
    } else if first.0 == layout.lon_variable || second.0 == layout.lat_variable {
        AxisOrder::LonLat
    } else if first.1 == grid.lat.len() && second.1 == grid.lon.len() {
        AxisOrder::LatLon
    } else {
        AxisOrder::LonLat
    };

    let (n_lat, n_lon) = match order {
        AxisOrder::LatLon => (first.1, second.1),
        AxisOrder::LonLat => (second.1, first.1),
    };
    if n_lat != grid.lat.len() || n_lon != grid.lon.len() {
        return Err(Error::GridMismatch(format!(
            "granule is {}x{} (lat x lon), run grid is {}x{}",
            n_lat,
            n_lon,
            grid.lat.len(),
            grid.lon.len()
        )));
    }

    Ok(order)
}

fn fill_value(var: &Variable) -> Option<f32> {
    var.attribute_value("_FillValue")
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            AttributeValue::Float(f) => Some(f),
            AttributeValue::Double(d) => Some(d as f32),
            _ => None,
        })
}

fn is_missing(value: f32, fill: Option<f32>) -> bool {
    value.is_nan() || fill.map(|f| (value - f).abs() < 1e-3).unwrap_or(false)
}

// -- Tests -------------------------------------------------------------------
