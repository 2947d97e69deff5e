//! Run configuration.
//!
//! Every path, date range, station list and variable list lives here rather
//! than in code. Values come from an optional YAML file and default to the
//! Yellowstone River setup.

use std::{fs, path::{Path, PathBuf}};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    earthdata::{GranuleQuery, CMR_GRANULE_SEARCH},
    error::{Error, Result},
    granule::GranuleLayout,
    hysets::{DatasetVersion, StationRequest},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub precip: PrecipConfig,
    pub subset: SubsetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecipConfig {
    pub short_name: String,
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    pub search_url: String,
    pub page_size: usize,
    /// Environment variable holding the Earthdata Login token.
    pub token_env: String,
    /// Granule download cache.
    pub data_dir: PathBuf,
    pub file_extension: String,
    pub basin_file: PathBuf,
    pub layout: GranuleLayout,
    /// Monthly series (parquet); a dated file in the home directory if unset.
    pub output: Option<PathBuf>,
    /// Optional NetCDF cube of the clipped time series.
    pub clipped_output: Option<PathBuf>,
}

impl Default for PrecipConfig {
    fn default() -> Self {
        PrecipConfig {
            short_name: "GPM_3IMERGM".to_string(),
            start_date: NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
            search_url: CMR_GRANULE_SEARCH.to_string(),
            page_size: 2000,
            token_env: "EARTHDATA_TOKEN".to_string(),
            data_dir: PathBuf::from("data/IMERG-Final_monthly"),
            file_extension: "HDF5".to_string(),
            basin_file: PathBuf::from("data/YellowstoneRiver_drainage_WGS84.geojson"),
            layout: GranuleLayout::default(),
            output: None,
            clipped_output: None,
        }
    }
}

impl PrecipConfig {
    pub fn query(&self) -> GranuleQuery {
        GranuleQuery {
            short_name: self.short_name.clone(),
            start: self.start_date,
            end: self.end_date,
            page_size: self.page_size,
        }
    }

    pub fn in_range(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetConfig {
    pub source: PathBuf,
    /// NetCDF output; a dated file in the home directory if unset.
    pub output: Option<PathBuf>,
    pub version: DatasetVersion,
    /// Overrides the version's variable list.
    pub variables: Option<Vec<String>>,
    pub station_dimension: String,
    pub stations: Vec<StationRequest>,
}

impl Default for SubsetConfig {
    fn default() -> Self {
        SubsetConfig {
            source: PathBuf::from("data/HYSETS_2020_QC_stations.nc"),
            output: None,
            version: DatasetVersion::Hysets2020,
            variables: None,
            station_dimension: "watershed".to_string(),
            // WatershedID 8210; indices are zero-based.
            stations: vec![StationRequest::new(8209, "YellowstoneRiver")],
        }
    }
}

impl SubsetConfig {
    pub fn variables(&self) -> Vec<String> {
        match &self.variables {
            Some(variables) => variables.clone(),
            None => self
                .version
                .variables()
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Reads a YAML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&text)?;

        Ok(config)
    }

    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.precip.start_date > self.precip.end_date {
            return Err(Error::InvalidConfig(format!(
                "start date {} is after end date {}",
                self.precip.start_date, self.precip.end_date
            )));
        }
        if self.precip.page_size == 0 {
            return Err(Error::InvalidConfig("page_size must be positive".to_string()));
        }
        if self.subset.stations.is_empty() {
            return Err(Error::InvalidConfig("no stations requested".to_string()));
        }
        if self.subset.variables().is_empty() {
            return Err(Error::InvalidConfig("no variables requested".to_string()));
        }

        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_yellowstone_setup() {
        let config = Config::default();

        assert_eq!(config.precip.short_name, "GPM_3IMERGM");
        assert_eq!(
            config.precip.query().temporal(),
            "2014-01-01T00:00:00Z,2023-12-31T23:59:59Z"
        );
        assert_eq!(
            config.subset.stations,
            vec![StationRequest::new(8209, "YellowstoneRiver")]
        );
        assert_eq!(config.subset.variables().len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_read_partial_yaml() {
        let yaml = r#"
precip:
  start_date: 2020-01-01
  end_date: 2020-12-31
  layout:
    variable: precipitationCal
subset:
  version: hysets-2023
  stations:
    - index: 8753
      name: KansasRiver
    - index: 8209
      name: YellowstoneRiver
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.precip.short_name, "GPM_3IMERGM");
        assert_eq!(
            config.precip.start_date,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert_eq!(config.precip.layout.variable, "precipitationCal");
        assert_eq!(config.precip.layout.group, "Grid");
        assert_eq!(config.subset.version, DatasetVersion::Hysets2023);
        assert_eq!(config.subset.stations.len(), 2);
        assert_eq!(config.subset.variables()[1], "total_precipitation");
    }

    #[test]
    fn should_override_variables() {
        let config = SubsetConfig {
            variables: Some(vec!["discharge".to_string()]),
            ..Default::default()
        };

        assert_eq!(config.variables(), vec!["discharge"]);
    }

    #[test]
    fn should_reject_inverted_date_range() {
        let mut config = Config::default();
        config.precip.start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn should_reject_empty_station_list() {
        let mut config = Config::default();
        config.subset.stations.clear();

        assert!(config.validate().is_err());
    }

    #[test]
    fn should_check_date_range_inclusively() {
        let config = PrecipConfig::default();

        assert!(config.in_range(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
        assert!(!config.in_range(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    }
}
