//! Error types shared by both pipelines.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is fatal for the run; there is no recovery path.
#[derive(Error, Debug)]
pub enum Error {
    /// No usable Earthdata credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The date token could not be extracted from a granule file name.
    #[error("cannot parse a YYYYMMDD date from file name `{0}`")]
    MalformedFileName(String),

    #[error("group `{group}` not found in {path}")]
    MissingGroup { path: PathBuf, group: String },

    #[error("variable `{variable}` not found in {path}")]
    MissingVariable { path: PathBuf, variable: String },

    /// A granule's grid differs from the grid established for the run.
    #[error("grid mismatch: {0}")]
    GridMismatch(String),

    #[error("CRS mismatch: basin is {basin}, grid is {grid}")]
    CrsMismatch { basin: String, grid: String },

    #[error("invalid basin geometry: {0}")]
    InvalidGeometry(String),

    #[error("station index {index} out of range (source has {count} stations)")]
    StationOutOfRange { index: usize, count: usize },

    /// Requested variables absent from the source schema.
    #[error("variables missing from source: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("invalid dimension layout: {0}")]
    InvalidLayout(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("download of {url} failed: HTTP {status}")]
    Download { url: String, status: u16 },

    #[error(transparent)]
    Netcdf(#[from] netcdf::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}
