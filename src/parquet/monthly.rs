//! Save the basin's monthly precipitation series to a parquet file.

use std::{fs::File, path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, RecordBatch, UInt64Array},
    datatypes::{DataType, Field, Schema},
};
use chrono::NaiveDate;
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::{aggregate::MonthlyTotal, error::Result};

pub fn save_monthly(totals: &[MonthlyTotal], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("precip_mm", DataType::Float64, true),
        Field::new("cell_count", DataType::UInt64, false),
        Field::new("granule_count", DataType::UInt64, false),
    ]));

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let num_rows = totals.len();
    let mut dates = Vec::with_capacity(num_rows);
    let mut precips = Vec::with_capacity(num_rows);
    let mut cells = Vec::with_capacity(num_rows);
    let mut granules = Vec::with_capacity(num_rows);

    for t in totals {
        dates.push(date32(t.month));
        precips.push(Some(t.total_mm).filter(|v| !v.is_nan()));
        cells.push(t.cells as u64);
        granules.push(t.steps as u64);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(dates)),
        Arc::new(Float64Array::from(precips)),
        Arc::new(UInt64Array::from(cells)),
        Arc::new(UInt64Array::from(granules)),
    ];

    let batch = RecordBatch::try_new(schema, columns)?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

// Days since the Unix epoch.
fn date32(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

// -- Tests -------------------------------------------------------------------
