//! Station subsetting of HYSETS multi-basin datasets.
//!
//! The requested variables of each station are sliced out of the source,
//! concatenated along a new `id` dimension in request order and written to a
//! single NetCDF file. Any failure aborts the whole subset.

pub mod extract;
pub mod schema;
pub mod source;
pub mod write;

use indicatif::ProgressBar;
use tracing::info;

pub use extract::{concat_stations, extract_station, StationDataset, StationRecord, StationRequest};
pub use schema::{validate_schema, DatasetVersion};
pub use source::{NetcdfSource, StationSource, VariableSlice};
pub use write::write_netcdf;

use crate::error::Result;

/// Validates the schema, then extracts and concatenates every station.
pub fn subset_stations<S: StationSource + ?Sized>(
    source: &S,
    stations: &[StationRequest],
    variables: &[String],
    progress_bar: &ProgressBar,
) -> Result<StationDataset> {
    validate_schema(source, variables)?;

    let mut records = Vec::with_capacity(stations.len());
    for request in stations {
        info!(index = request.index, name = %request.name, "extracting station");
        records.push(extract_station(source, request, variables)?);
        progress_bar.inc(1);
    }

    concat_stations(records)
}

// -- Tests -------------------------------------------------------------------
