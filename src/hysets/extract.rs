//! Per-station extraction and concatenation along `id`.

use std::{fmt, str::FromStr};

use netcdf::AttributeValue;
use serde::{Deserialize, Serialize};

use super::source::{Dim, StationSource, VariableSlice};
use crate::error::{Error, Result};

/// A station index in the source and the name it is written under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRequest {
    pub index: usize,
    pub name: String,
}

impl StationRequest {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        StationRequest {
            index,
            name: name.into(),
        }
    }
}

impl fmt::Display for StationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.name)
    }
}

/// Parses `INDEX:NAME`, e.g. `8209:YellowstoneRiver`.
impl FromStr for StationRequest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (index, name) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidConfig(format!("expected INDEX:NAME, got `{}`", s)))?;
        let index = index
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::InvalidConfig(format!("invalid station index `{}`", index)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidConfig(format!("station {} has no name", index)));
        }

        Ok(StationRequest::new(index, name))
    }
}

/// The requested variables of one station.
#[derive(Debug, Clone)]
pub struct StationRecord {
    pub request: StationRequest,
    pub variables: Vec<VariableSlice>,
    /// Coordinate variables of the non-station dimensions.
    pub coordinates: Vec<VariableSlice>,
}

impl StationRecord {
    pub fn variable(&self, name: &str) -> Option<&VariableSlice> {
        self.variables.iter().find(|v| v.name == name)
    }
}

pub fn extract_station<S: StationSource + ?Sized>(
    source: &S,
    request: &StationRequest,
    variables: &[String],
) -> Result<StationRecord> {
    let count = source.station_count();
    if request.index >= count {
        return Err(Error::StationOutOfRange {
            index: request.index,
            count,
        });
    }

    let slices = variables
        .iter()
        .map(|v| source.read_station(v, request.index))
        .collect::<Result<Vec<_>>>()?;

    let mut dimensions: Vec<&str> = Vec::new();
    for dim in slices.iter().flat_map(|s| s.dims.iter()) {
        if !dimensions.contains(&dim.name.as_str()) {
            dimensions.push(&dim.name);
        }
    }

    let mut coordinates = Vec::new();
    for dimension in dimensions {
        if let Some(coordinate) = source.read_coordinate(dimension)? {
            coordinates.push(coordinate);
        }
    }

    Ok(StationRecord {
        request: request.clone(),
        variables: slices,
        coordinates,
    })
}

/// One variable stacked over every station, station-major.
#[derive(Debug, Clone)]
pub struct StackedVariable {
    pub name: String,
    /// Dimensions after `id`.
    pub dims: Vec<Dim>,
    pub attributes: Vec<(String, AttributeValue)>,
    pub values: Vec<f64>,
}

impl StackedVariable {
    pub fn station_size(&self) -> usize {
        self.dims.iter().map(|d| d.len).product()
    }

    pub fn station_values(&self, station: usize) -> &[f64] {
        let size = self.station_size();
        &self.values[station * size..(station + 1) * size]
    }
}

/// Stations concatenated along a new `id` dimension, in request order.
#[derive(Debug, Clone)]
pub struct StationDataset {
    pub stations: Vec<StationRequest>,
    pub variables: Vec<StackedVariable>,
    pub coordinates: Vec<VariableSlice>,
}

impl StationDataset {
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Station `i` as a single-station record.
    pub fn station(&self, i: usize) -> Option<StationRecord> {
        let request = self.stations.get(i)?.clone();
        let variables = self
            .variables
            .iter()
            .map(|v| VariableSlice {
                name: v.name.clone(),
                dims: v.dims.clone(),
                values: v.station_values(i).to_vec(),
                attributes: v.attributes.clone(),
            })
            .collect();

        Some(StationRecord {
            request,
            variables,
            coordinates: self.coordinates.clone(),
        })
    }
}

/// Concatenates records along `id`; all records must share one layout.
pub fn concat_stations(records: Vec<StationRecord>) -> Result<StationDataset> {
    let first = records
        .first()
        .ok_or_else(|| Error::InvalidConfig("no stations to concatenate".to_string()))?;

    let mut variables: Vec<StackedVariable> = first
        .variables
        .iter()
        .map(|v| StackedVariable {
            name: v.name.clone(),
            dims: v.dims.clone(),
            attributes: v.attributes.clone(),
            values: Vec::with_capacity(v.values.len() * records.len()),
        })
        .collect();
    let coordinates = first.coordinates.clone();

    for record in &records {
        if record.variables.len() != variables.len() {
            return Err(Error::InvalidLayout(format!(
                "station {} has {} variables, expected {}",
                record.request,
                record.variables.len(),
                variables.len()
            )));
        }

        for (stacked, slice) in variables.iter_mut().zip(&record.variables) {
            if slice.values.len() != slice.size() {
                return Err(Error::InvalidLayout(format!(
                    "station {} variable `{}` holds {} values for {} cells",
                    record.request,
                    slice.name,
                    slice.values.len(),
                    slice.size()
                )));
            }
            if slice.name != stacked.name || slice.dims != stacked.dims {
                return Err(Error::InvalidLayout(format!(
                    "station {} variable `{}` does not match `{}`",
                    record.request, slice.name, stacked.name
                )));
            }
            stacked.values.extend_from_slice(&slice.values);
        }
    }

    Ok(StationDataset {
        stations: records.into_iter().map(|r| r.request).collect(),
        variables,
        coordinates,
    })
}

// -- Tests -------------------------------------------------------------------
