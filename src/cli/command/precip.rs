use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};
use watershed::{
    aggregate::monthly_totals,
    basin::{Basin, Crs},
    clip::ClipMask,
    config::PrecipConfig,
    granule::{list_granules, load_granule, parse_granule_date, GridSpec},
    parquet::save_monthly,
    progress::create_progress_bar,
    series::ClippedSeries,
};

use super::{download::fetch_granules, make_output_file_name};

pub async fn precip(config: &PrecipConfig, skip_download: bool) -> Result<String> {
    if skip_download {
        info!("skipping download, using {}", config.data_dir.display());
    } else {
        fetch_granules(config).await?;
    }

    let basin = Basin::from_file(&config.basin_file)
        .with_context(|| format!("reading basin {}", config.basin_file.display()))?;

    let files = select_granules(config)?;
    if files.is_empty() {
        bail!(
            "no .{} granules between {} and {} in {}",
            config.file_extension,
            config.start_date,
            config.end_date,
            config.data_dir.display()
        );
    }

    let series = clip_granules(config, &basin, &files)?;
    let dates = series.dates();
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        info!(steps = series.len(), "clipped series spans {} to {}", first, last);
    }
    let totals = monthly_totals(&series);
    for total in &totals {
        debug!(cells = total.cells, "{}: {:.2} mm", total.month, total.total_mm);
    }

    if let Some(path) = &config.clipped_output {
        series
            .write_netcdf(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let output = config
        .output
        .clone()
        .unwrap_or_else(|| make_output_file_name("precip-monthly", "parquet"));
    save_monthly(&totals, &output)
        .with_context(|| format!("writing {}", output.display()))?;

    Ok(output.to_string_lossy().to_string())
}

/// Cached granules whose file date falls in the configured range, in date order.
fn select_granules(config: &PrecipConfig) -> Result<Vec<PathBuf>> {
    let files = list_granules(&config.data_dir, &config.file_extension)
        .with_context(|| format!("listing {}", config.data_dir.display()))?;

    let mut selected = vec![];
    for file in files {
        let date = parse_granule_date(&file_name(&file), config.layout.date_field)?;
        if config.in_range(date) {
            selected.push(file);
        }
    }

    Ok(selected)
}

fn clip_granules(config: &PrecipConfig, basin: &Basin, files: &[PathBuf]) -> Result<ClippedSeries> {
    // Coordinates come from the first granule only.
    let grid = Arc::new(
        GridSpec::from_granule(&files[0], &config.layout)
            .with_context(|| format!("reading grid from {}", files[0].display()))?,
    );
    let mask = ClipMask::new(&grid, &Crs::Wgs84, basin)?;
    if mask.is_empty() {
        warn!("basin {} covers no grid cell centres", basin.name);
    }
    info!(cells = mask.cells(), "basin mask built");

    let pb = create_progress_bar(files.len() as u64, "Clipping granules...".to_string());
    let mut fields = Vec::with_capacity(files.len());

    for file in files {
        let granule = load_granule(file, &grid, &config.layout)
            .with_context(|| format!("reading {}", file.display()))?;
        fields.push(mask.apply(&granule)?);
        pb.inc(1);
    }
    pb.finish_with_message("Granules clipped");

    Ok(ClippedSeries::concat(fields)?)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use arrow::array::{Array, Date32Array, Float64Array, UInt64Array};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const LON: [f64; 2] = [0.5, 1.5];
    const LAT: [f64; 2] = [0.5, 1.5];

    fn write_granule(dir: &Path, date: &str, rate: f32) {
        let name = format!("3B-MO.MS.MRG.3IMERG.{}-S000000-E235959.01.V07B.HDF5", date);
        let mut file = netcdf::create(dir.join(name)).unwrap();
        let mut grid = file.add_group("Grid").unwrap();
        grid.add_dimension("time", 1).unwrap();
        grid.add_dimension("lon", LON.len()).unwrap();
        grid.add_dimension("lat", LAT.len()).unwrap();

        let mut lon = grid.add_variable::<f64>("lon", &["lon"]).unwrap();
        lon.put_values(&LON, ..).unwrap();
        let mut lat = grid.add_variable::<f64>("lat", &["lat"]).unwrap();
        lat.put_values(&LAT, ..).unwrap();

        let mut precip = grid
            .add_variable::<f32>("precipitation", &["time", "lon", "lat"])
            .unwrap();
        precip.put_attribute("_FillValue", -9999.9f32).unwrap();
        precip.put_values(&[rate; 4], ..).unwrap();
    }

    fn write_basin(dir: &Path, ring: &str) -> PathBuf {
        let path = dir.join("basin.geojson");
        let text = format!(
            r#"{{"type": "Feature", "properties": {{}}, "geometry": {{"type": "Polygon", "coordinates": [{}]}}}}"#,
            ring
        );
        fs::write(&path, text).unwrap();

        path
    }

    fn config(dir: &Path, basin_file: PathBuf) -> PrecipConfig {
        PrecipConfig {
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
            data_dir: dir.join("granules"),
            basin_file,
            output: Some(dir.join("monthly.parquet")),
            ..Default::default()
        }
    }

    fn read_rows(path: &Path) -> (Vec<i32>, Vec<Option<f64>>, Vec<u64>) {
        let file = File::open(path).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();

        let dates = batch.column(0).as_any().downcast_ref::<Date32Array>().unwrap();
        let precip = batch.column(1).as_any().downcast_ref::<Float64Array>().unwrap();
        let cells = batch.column(2).as_any().downcast_ref::<UInt64Array>().unwrap();

        (
            dates.values().to_vec(),
            (0..precip.len())
                .map(|i| (!precip.is_null(i)).then(|| precip.value(i)))
                .collect(),
            cells.values().to_vec(),
        )
    }

    #[tokio::test]
    async fn should_write_monthly_totals_for_granules_in_range() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("granules");
        fs::create_dir_all(&data_dir).unwrap();
        write_granule(&data_dir, "20200101", 1.0);
        write_granule(&data_dir, "20200201", 2.0);
        write_granule(&data_dir, "20210101", 5.0);
        let basin = write_basin(dir.path(), "[[0, 0], [2, 0], [2, 2], [0, 2], [0, 0]]");
        let config = config(dir.path(), basin);

        let output = precip(&config, true).await.unwrap();

        assert_eq!(PathBuf::from(&output), dir.path().join("monthly.parquet"));
        let (dates, totals, cells) = read_rows(Path::new(&output));
        // 2020-01-01 and 2020-02-01 as days since the epoch.
        assert_eq!(dates, vec![18262, 18293]);
        assert_eq!(totals, vec![Some(24.0 * 31.0), Some(2.0 * 24.0 * 29.0)]);
        assert_eq!(cells, vec![4, 4]);
    }

    #[tokio::test]
    async fn should_write_null_totals_when_basin_misses_the_grid() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("granules");
        fs::create_dir_all(&data_dir).unwrap();
        write_granule(&data_dir, "20200301", 1.0);
        let basin = write_basin(dir.path(), "[[10, 10], [11, 10], [11, 11], [10, 10]]");
        let config = config(dir.path(), basin);

        let output = precip(&config, true).await.unwrap();

        let (dates, totals, cells) = read_rows(Path::new(&output));
        assert_eq!(dates.len(), 1);
        assert_eq!(totals, vec![None]);
        assert_eq!(cells, vec![0]);
    }

    #[test]
    fn should_fail_on_malformed_granule_name() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("granules");
        fs::create_dir_all(&data_dir).unwrap();
        write_granule(&data_dir, "20200101", 1.0);
        fs::write(data_dir.join("precipitation.HDF5"), b"not a granule").unwrap();
        let config = config(dir.path(), dir.path().join("basin.geojson"));

        assert!(select_granules(&config).is_err());
    }

    #[test]
    fn should_select_only_granules_in_range() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("granules");
        fs::create_dir_all(&data_dir).unwrap();
        write_granule(&data_dir, "20191201", 1.0);
        write_granule(&data_dir, "20200601", 1.0);
        let config = config(dir.path(), dir.path().join("basin.geojson"));

        let files = select_granules(&config).unwrap();

        assert_eq!(files.len(), 1);
        assert!(file_name(&files[0]).contains("20200601"));
    }
}
