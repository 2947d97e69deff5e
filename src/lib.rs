//! Watershed data tools.
//!
//! Two independent pipelines:
//!
//! - basin precipitation: search and download IMERG granules, clip each to a
//!   basin polygon and reduce the series to monthly basin totals;
//! - station subsetting: slice a versioned variable set for a list of
//!   stations out of a HYSETS dataset into one NetCDF file.

pub mod aggregate;
pub mod basin;
pub mod clip;
pub mod config;
pub mod download;
pub mod earthdata;
pub mod error;
pub mod granule;
pub mod hysets;
pub mod parquet;
pub mod progress;
pub mod series;

pub use error::{Error, Result};
