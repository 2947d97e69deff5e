//! Command line interface.

pub mod command;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use watershed::hysets::{DatasetVersion, StationRequest};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Basin precipitation and station subsetting tools
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "WATERSHED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute monthly basin precipitation from IMERG granules
    Precip {
        /// Use only granules already in the data directory
        #[arg(long)]
        skip_download: bool,

        /// Basin boundary (GeoJSON or WKT)
        #[arg(long)]
        basin: Option<PathBuf>,

        /// Parquet file for the monthly series
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// NetCDF file for the clipped time series
        #[arg(long)]
        clipped_output: Option<PathBuf>,
    },
    /// Download granules into the data directory
    Download {},
    /// Extract stations from a HYSETS dataset
    Subset {
        /// HYSETS NetCDF file
        #[arg(long)]
        source: Option<PathBuf>,

        /// NetCDF output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dataset version (hysets-2020 or hysets-2023)
        #[arg(long)]
        dataset_version: Option<DatasetVersion>,

        /// Station as INDEX:NAME, repeatable
        #[arg(long = "station")]
        stations: Vec<StationRequest>,
    },
    /// List the variables of a station dataset
    Schema {
        /// HYSETS NetCDF file
        #[arg(long)]
        source: Option<PathBuf>,
    },
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_subset_stations() {
        let cli = Cli::parse_from([
            "watershed",
            "subset",
            "--station",
            "8753:KansasRiver",
            "--station",
            "8209:YellowstoneRiver",
            "--dataset-version",
            "hysets-2020",
        ]);

        match cli.command {
            Commands::Subset {
                stations,
                dataset_version,
                ..
            } => {
                assert_eq!(stations.len(), 2);
                assert_eq!(stations[0], StationRequest::new(8753, "KansasRiver"));
                assert_eq!(dataset_version, Some(DatasetVersion::Hysets2020));
            }
            _ => panic!("expected subset command"),
        }
    }

    #[test]
    fn should_count_verbosity() {
        let cli = Cli::parse_from(["watershed", "-vv", "precip", "--skip-download"]);

        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Precip {
                skip_download: true,
                ..
            }
        ));
    }
}
