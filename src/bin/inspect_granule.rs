//! Granule inspection utility.
//!
//! Prints the groups, dimensions and variables of an IMERG granule, the date
//! parsed from its file name and the extent of its grid. Useful for checking
//! a new product's layout before a `precip` run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use watershed::granule::{parse_granule_date, GranuleLayout, GridSpec};

#[derive(Parser)]
#[command(version, about = "Inspect the layout of a precipitation granule")]
struct Args {
    /// Granule file (HDF5 or NetCDF)
    granule: PathBuf,

    /// Group holding the grid
    #[arg(long, default_value = "Grid")]
    group: String,

    /// File name field holding the date
    #[arg(long, default_value_t = 4)]
    date_field: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let file = netcdf::open(&args.granule)
        .with_context(|| format!("opening {}", args.granule.display()))?;

    println!("🔍 {}\n", args.granule.display());

    let file_name = args
        .granule
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match parse_granule_date(&file_name, args.date_field) {
        Ok(date) => println!("Date: {}", date),
        Err(e) => println!("Date: unavailable ({})", e),
    }

    println!("\nGroups:");
    for group in file.groups()? {
        println!("  • {}", group.name());
        for dim in group.dimensions() {
            println!("      dim {} = {}", dim.name(), dim.len());
        }
        for var in group.variables() {
            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            println!("      var {}({})", var.name(), dims.join(", "));
        }
    }

    let layout = GranuleLayout {
        group: args.group,
        date_field: args.date_field,
        ..Default::default()
    };
    match GridSpec::from_granule(&args.granule, &layout) {
        Ok(grid) => {
            println!("\nGrid: {} x {} cells", grid.lon.len(), grid.lat.len());
            if let (Some(w), Some(e), Some(s), Some(n)) =
                (grid.lon.first(), grid.lon.last(), grid.lat.first(), grid.lat.last())
            {
                println!("  lon {} .. {}", w, e);
                println!("  lat {} .. {}", s, n);
            }
        }
        Err(e) => println!("\nGrid: unreadable with group `{}` ({})", layout.group, e),
    }

    Ok(())
}
