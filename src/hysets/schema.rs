//! HYSETS dataset versions and their variable names.
//!
//! Variable names drifted between releases, so the variable list is tied to
//! a version and checked against the source when it is opened.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::source::StationSource;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetVersion {
    #[serde(rename = "hysets-2020")]
    Hysets2020,
    #[serde(rename = "hysets-2023")]
    Hysets2023,
}

impl DatasetVersion {
    pub fn all() -> [DatasetVersion; 2] {
        [DatasetVersion::Hysets2020, DatasetVersion::Hysets2023]
    }

    /// Default variables extracted for this version.
    pub fn variables(&self) -> &'static [&'static str] {
        match self {
            DatasetVersion::Hysets2020 => {
                &["discharge", "pr", "tasmax", "tasmin", "slope", "elevation"]
            }
            DatasetVersion::Hysets2023 => &[
                "discharge",
                "total_precipitation",
                "2m_tasmax",
                "2m_tasmin",
                "drainage_area",
                "slope",
                "elevation",
            ],
        }
    }

    /// Versions whose variables are all present in `source`.
    pub fn detect<S: StationSource + ?Sized>(source: &S) -> Vec<DatasetVersion> {
        DatasetVersion::all()
            .into_iter()
            .filter(|v| v.variables().iter().all(|var| source.has_variable(var)))
            .collect()
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetVersion::Hysets2020 => write!(f, "hysets-2020"),
            DatasetVersion::Hysets2023 => write!(f, "hysets-2023"),
        }
    }
}

impl FromStr for DatasetVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hysets-2020" | "2020" => Ok(DatasetVersion::Hysets2020),
            "hysets-2023" | "2023" => Ok(DatasetVersion::Hysets2023),
            other => Err(Error::InvalidConfig(format!(
                "unknown dataset version `{}` (expected hysets-2020 or hysets-2023)",
                other
            ))),
        }
    }
}

/// Fails with every requested variable the source lacks.
pub fn validate_schema<S: StationSource + ?Sized>(source: &S, variables: &[String]) -> Result<()> {
    let missing: Vec<String> = variables
        .iter()
        .filter(|v| !source.has_variable(v))
        .cloned()
        .collect();

    if !missing.is_empty() {
        return Err(Error::MissingVariables(missing));
    }

    Ok(())
}

// -- Tests -------------------------------------------------------------------
