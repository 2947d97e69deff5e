mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use tracing_subscriber::EnvFilter;
use watershed::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    let message = match cli.command {
        Commands::Precip {
            skip_download,
            basin,
            output,
            clipped_output,
        } => {
            if let Some(basin) = basin {
                config.precip.basin_file = basin;
            }
            if output.is_some() {
                config.precip.output = output;
            }
            if clipped_output.is_some() {
                config.precip.clipped_output = clipped_output;
            }
            config.validate()?;

            let file_name = command::precip(&config.precip, skip_download).await?;
            format!("File saved to `{}`", file_name)
        }
        Commands::Download {} => {
            config.validate()?;

            let summary = command::download(&config.precip).await?;
            format!("Downloaded {}", summary)
        }
        Commands::Subset {
            source,
            output,
            dataset_version,
            stations,
        } => {
            if let Some(source) = source {
                config.subset.source = source;
            }
            if output.is_some() {
                config.subset.output = output;
            }
            if let Some(version) = dataset_version {
                config.subset.version = version;
            }
            if !stations.is_empty() {
                config.subset.stations = stations;
            }
            config.validate()?;

            let file_name = command::subset(&config.subset)?;
            format!("File saved to `{}`", file_name)
        }
        Commands::Schema { source } => {
            let source = source.unwrap_or_else(|| config.subset.source.clone());
            command::schema(&source, &config.subset.station_dimension)?
        }
    };

    println!("{}", message);

    Ok(())
}

/// `RUST_LOG` wins over the `-v` count.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,watershed={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
