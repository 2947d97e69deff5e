//! Writes a station subset as NetCDF.

use std::path::Path;

use tracing::info;

use super::extract::StationDataset;
use crate::error::{Error, Result};

/// Writes `dataset` with `id` as the leading dimension of every variable.
///
/// `id` holds the source station index and `name` the requested name.
pub fn write_netcdf(dataset: &StationDataset, path: &Path, attributes: &[(&str, String)]) -> Result<()> {
    if dataset.is_empty() {
        return Err(Error::InvalidConfig("no stations to write".to_string()));
    }

    let mut file = netcdf::create(path)?;

    file.add_dimension("id", dataset.len())?;

    let mut added: Vec<(String, usize)> = Vec::new();
    let dims = dataset
        .variables
        .iter()
        .flat_map(|v| v.dims.iter())
        .chain(dataset.coordinates.iter().flat_map(|c| c.dims.iter()));
    for dim in dims {
        let existing = added
            .iter()
            .find(|(name, _)| *name == dim.name)
            .map(|(_, len)| *len);
        match existing {
            Some(len) if len != dim.len => {
                return Err(Error::InvalidLayout(format!(
                    "dimension `{}` has lengths {} and {}",
                    dim.name, len, dim.len
                )))
            }
            Some(_) => {}
            None => {
                file.add_dimension(&dim.name, dim.len)?;
                added.push((dim.name.clone(), dim.len));
            }
        }
    }

    let indices: Vec<i64> = dataset.stations.iter().map(|s| s.index as i64).collect();
    let mut id_var = file.add_variable::<i64>("id", &["id"])?;
    id_var.put_attribute("long_name", "station index in source dataset")?;
    id_var.put_values(&indices, ..)?;

    let mut name_var = file.add_string_variable("name", &["id"])?;
    name_var.put_attribute("long_name", "station name")?;
    for (i, station) in dataset.stations.iter().enumerate() {
        name_var.put_string(&station.name, i)?;
    }

    for coordinate in &dataset.coordinates {
        let dims: Vec<&str> = coordinate.dims.iter().map(|d| d.name.as_str()).collect();
        let mut var = file.add_variable::<f64>(&coordinate.name, &dims)?;
        for (name, value) in &coordinate.attributes {
            var.put_attribute(name, value.clone())?;
        }
        var.put_values(&coordinate.values, ..)?;
    }

    for variable in &dataset.variables {
        let dims: Vec<&str> = std::iter::once("id")
            .chain(variable.dims.iter().map(|d| d.name.as_str()))
            .collect();
        let mut var = file.add_variable::<f64>(&variable.name, &dims)?;
        for (name, value) in &variable.attributes {
            var.put_attribute(name, value.clone())?;
        }
        var.put_values(&variable.values, ..)?;
    }

    for (name, value) in attributes {
        file.add_attribute(name, value.as_str())?;
    }

    info!(
        stations = dataset.len(),
        variables = dataset.variables.len(),
        "station subset written to {}",
        path.display()
    );

    Ok(())
}
