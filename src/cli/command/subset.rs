use anyhow::{Context, Result};
use chrono::Utc;
use watershed::{
    config::SubsetConfig,
    hysets::{subset_stations, write_netcdf, NetcdfSource},
    progress::{create_progress_bar, create_spinner},
};

use super::make_output_file_name;

pub fn subset(config: &SubsetConfig) -> Result<String> {
    let variables = config.variables();

    let spinner = create_spinner(format!("Opening {}...", config.source.display()));
    let source = NetcdfSource::open(&config.source, &config.station_dimension)
        .with_context(|| format!("opening {}", config.source.display()))?;
    spinner.finish_with_message("Dataset opened");

    let pb = create_progress_bar(config.stations.len() as u64, "Extracting stations...".to_string());
    let dataset = subset_stations(&source, &config.stations, &variables, &pb)?;
    pb.finish_with_message("Stations extracted");

    let output = config
        .output
        .clone()
        .unwrap_or_else(|| make_output_file_name("hysets-subset", "nc"));
    let attributes = [
        ("source", source.path().to_string_lossy().to_string()),
        ("dataset_version", config.version.to_string()),
        ("history", format!("subset created {}", Utc::now().to_rfc3339())),
    ];
    write_netcdf(&dataset, &output, &attributes)
        .with_context(|| format!("writing {}", output.display()))?;

    Ok(output.to_string_lossy().to_string())
}
