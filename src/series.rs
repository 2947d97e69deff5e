//! Time series of clipped fields.

use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::{
    basin::Crs,
    clip::ClippedField,
    error::{Error, Result},
};

/// Clipped fields ordered by date, all on one grid and CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedSeries {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub crs: Crs,
    pub steps: Vec<ClippedField>,
}

impl ClippedSeries {
    /// Concatenates fields along time.
    ///
    /// Fields are sorted by date; any difference in grid or CRS is an error.
    pub fn concat(mut fields: Vec<ClippedField>) -> Result<Self> {
        fields.sort_by_key(|f| f.date);

        let (lon, lat, crs) = match fields.first() {
            Some(first) => (first.lon.clone(), first.lat.clone(), first.crs.clone()),
            None => (Vec::new(), Vec::new(), Crs::Wgs84),
        };

        for field in &fields {
            if field.lon != lon || field.lat != lat {
                return Err(Error::GridMismatch(format!(
                    "step {} has a {}x{} grid, series has {}x{}",
                    field.date,
                    field.lat.len(),
                    field.lon.len(),
                    lat.len(),
                    lon.len()
                )));
            }
            if field.crs != crs {
                return Err(Error::CrsMismatch {
                    basin: crs.to_string(),
                    grid: field.crs.to_string(),
                });
            }
        }

        Ok(ClippedSeries {
            lon,
            lat,
            crs,
            steps: fields,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.steps.iter().map(|s| s.date).collect()
    }

    /// Writes the series as a `time x lat x lon` NetCDF cube.
    pub fn write_netcdf(&self, path: &Path) -> Result<()> {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
            .ok_or_else(|| Error::InvalidConfig("invalid epoch".to_string()))?;

        let crs = self.crs.to_string();

        let mut file = netcdf::create(path)?;
        file.add_dimension("time", self.len())?;
        file.add_dimension("lat", self.lat.len())?;
        file.add_dimension("lon", self.lon.len())?;

        let days: Vec<f64> = self
            .steps
            .iter()
            .map(|s| (s.date - epoch).num_days() as f64)
            .collect();
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("standard_name", "time")?;
        time_var.put_attribute("units", "days since 1970-01-01")?;
        time_var.put_attribute("calendar", "standard")?;
        time_var.put_values(&days, ..)?;

        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_attribute("standard_name", "latitude")?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_values(&self.lat, ..)?;

        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_attribute("standard_name", "longitude")?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_values(&self.lon, ..)?;

        let mut precip_var =
            file.add_variable::<f32>("precipitation", &["time", "lat", "lon"])?;
        precip_var.put_attribute("_FillValue", f32::NAN)?;
        precip_var.put_attribute("long_name", "precipitation rate clipped to basin")?;
        precip_var.put_attribute("units", "mm/hr")?;
        precip_var.put_attribute("grid_mapping_crs", crs.as_str())?;
        for (t, step) in self.steps.iter().enumerate() {
            if !step.values.is_empty() {
                precip_var.put_values(&step.values, (t, .., ..))?;
            }
        }

        file.add_attribute("crs", crs.as_str())?;
        file.add_attribute("title", "Basin-clipped precipitation")?;

        info!(steps = self.steps.len(), "clipped series written to {}", path.display());

        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------
