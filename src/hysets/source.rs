//! Read access to a multi-station dataset.

use std::path::{Path, PathBuf};

use netcdf::AttributeValue;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dim {
    pub name: String,
    pub len: usize,
}

impl Dim {
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Dim {
            name: name.into(),
            len,
        }
    }
}

/// One variable at one station, with the station dimension removed.
#[derive(Debug, Clone)]
pub struct VariableSlice {
    pub name: String,
    pub dims: Vec<Dim>,
    /// Row-major over `dims`; a single value for static attributes.
    pub values: Vec<f64>,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl VariableSlice {
    pub fn size(&self) -> usize {
        self.dims.iter().map(|d| d.len).product()
    }
}

/// A dataset holding many stations along one dimension.
pub trait StationSource {
    fn station_count(&self) -> usize;

    fn variable_names(&self) -> Vec<String>;

    fn has_variable(&self, name: &str) -> bool {
        self.variable_names().iter().any(|v| v == name)
    }

    /// Reads `variable` at station `index`.
    fn read_station(&self, variable: &str, index: usize) -> Result<VariableSlice>;

    /// Reads the coordinate variable of a non-station dimension, if any.
    fn read_coordinate(&self, dimension: &str) -> Result<Option<VariableSlice>>;
}

/// A station dataset stored in a NetCDF file.
pub struct NetcdfSource {
    path: PathBuf,
    file: netcdf::File,
    station_dimension: String,
    station_count: usize,
}

impl NetcdfSource {
    pub fn open(path: &Path, station_dimension: &str) -> Result<Self> {
        let file = netcdf::open(path)?;
        let station_count = file
            .dimension(station_dimension)
            .map(|d| d.len())
            .ok_or_else(|| {
                Error::InvalidLayout(format!(
                    "{} has no `{}` dimension",
                    path.display(),
                    station_dimension
                ))
            })?;

        Ok(NetcdfSource {
            path: path.to_path_buf(),
            file,
            station_dimension: station_dimension.to_string(),
            station_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every dimension of the file with its length.
    pub fn dimensions(&self) -> Vec<Dim> {
        self.file
            .dimensions()
            .map(|d| Dim::new(d.name(), d.len()))
            .collect()
    }

    /// Dimension names of `variable`, if it exists.
    pub fn variable_dimensions(&self, variable: &str) -> Option<Vec<String>> {
        self.file
            .variable(variable)
            .map(|v| v.dimensions().iter().map(|d| d.name()).collect())
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| Error::MissingVariable {
                path: self.path.clone(),
                variable: name.to_string(),
            })
    }
}

impl StationSource for NetcdfSource {
    fn station_count(&self) -> usize {
        self.station_count
    }

    fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|v| v.name()).collect()
    }

    fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    fn read_station(&self, variable: &str, index: usize) -> Result<VariableSlice> {
        if index >= self.station_count {
            return Err(Error::StationOutOfRange {
                index,
                count: self.station_count,
            });
        }

        let var = self.variable(variable)?;
        let dims: Vec<Dim> = var
            .dimensions()
            .iter()
            .map(|d| Dim::new(d.name(), d.len()))
            .collect();
        let position = dims
            .iter()
            .position(|d| d.name == self.station_dimension)
            .ok_or_else(|| {
                Error::InvalidLayout(format!(
                    "variable `{}` has no `{}` dimension",
                    variable, self.station_dimension
                ))
            })?;

        let start: Vec<usize> = dims
            .iter()
            .enumerate()
            .map(|(i, _)| if i == position { index } else { 0 })
            .collect();
        let count: Vec<usize> = dims
            .iter()
            .enumerate()
            .map(|(i, d)| if i == position { 1 } else { d.len })
            .collect();

        let values: Vec<f64> = var.get_values((start.as_slice(), count.as_slice()))?;
        let remaining = dims
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, d)| d)
            .collect();

        Ok(VariableSlice {
            name: variable.to_string(),
            dims: remaining,
            values,
            attributes: read_attributes(&var),
        })
    }

    fn read_coordinate(&self, dimension: &str) -> Result<Option<VariableSlice>> {
        let var = match self.file.variable(dimension) {
            Some(var) => var,
            None => return Ok(None),
        };

        let dims: Vec<Dim> = var
            .dimensions()
            .iter()
            .map(|d| Dim::new(d.name(), d.len()))
            .collect();
        if dims.len() != 1 || dims[0].name != dimension {
            return Ok(None);
        }

        let values: Vec<f64> = var.get_values(..)?;

        Ok(Some(VariableSlice {
            name: dimension.to_string(),
            dims,
            values,
            attributes: read_attributes(&var),
        }))
    }
}

// Values are written back as f64, so numeric fill markers must match.
fn read_attributes(var: &netcdf::Variable) -> Vec<(String, AttributeValue)> {
    var.attributes()
        .filter_map(|attr| {
            let name = attr.name().to_string();
            let value = attr.value().ok()?;
            let value = match name.as_str() {
                "_FillValue" | "missing_value" => AttributeValue::Double(as_f64(&value)?),
                _ => value,
            };
            Some((name, value))
        })
        .collect()
}

fn as_f64(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Double(d) => Some(*d),
        AttributeValue::Float(f) => Some(*f as f64),
        AttributeValue::Int(i) => Some(*i as f64),
        AttributeValue::Short(s) => Some(*s as f64),
        AttributeValue::Longlong(l) => Some(*l as f64),
        AttributeValue::Schar(b) => Some(*b as f64),
        AttributeValue::Uchar(b) => Some(*b as f64),
        AttributeValue::Ushort(s) => Some(*s as f64),
        AttributeValue::Uint(u) => Some(*u as f64),
        AttributeValue::Ulonglong(u) => Some(*u as f64),
        _ => None,
    }
}

// -- Tests -------------------------------------------------------------------
