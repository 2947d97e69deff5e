use std::path::Path;

use anyhow::{Context, Result};
use watershed::hysets::{DatasetVersion, NetcdfSource, StationSource};

/// Prints the dimensions and variables of a station dataset and the
/// versions it satisfies.
pub fn schema(path: &Path, station_dimension: &str) -> Result<String> {
    let source = NetcdfSource::open(path, station_dimension)
        .with_context(|| format!("opening {}", path.display()))?;

    println!("{}", path.display());
    println!("Dimensions:");
    for dim in source.dimensions() {
        println!("  {} = {}", dim.name, dim.len);
    }

    println!("Variables:");
    for name in source.variable_names() {
        let dims = source.variable_dimensions(&name).unwrap_or_default();
        println!("  {}({})", name, dims.join(", "));
    }

    let versions = DatasetVersion::detect(&source);
    let summary = if versions.is_empty() {
        "matches no known dataset version".to_string()
    } else {
        let names: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        format!("matches {}", names.join(", "))
    };

    Ok(summary)
}
