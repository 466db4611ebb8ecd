use anyhow::{Context, Result};
use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{
    fs::{self, File},
    io::Cursor,
    path::Path,
    sync::Arc,
};
use tracing::{debug, info};

use super::{utils::missing_marker_regex, TableFormat};

const BATCH_SIZE: usize = 8192;

/// Load a whole table into one `RecordBatch`.
///
/// CSV input gets its column types inferred from every row, with
/// [`MISSING_MARKERS`](super::MISSING_MARKERS) read as nulls.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let path = path.as_ref();
    let batch = match TableFormat::from_path(path) {
        TableFormat::Csv => {
            let data =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            load_csv_bytes(&data).with_context(|| format!("Failed to parse {}", path.display()))?
        }
        TableFormat::Parquet => load_parquet(path)?,
    };
    info!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "loaded table"
    );
    Ok(batch)
}

/// Parse an in-memory CSV (with header row) into one `RecordBatch`.
pub fn load_csv_bytes(data: &[u8]) -> Result<RecordBatch> {
    let nulls = missing_marker_regex();
    let format = Format::default()
        .with_header(true)
        .with_quote(b'"')
        .with_delimiter(b',')
        .with_null_regex(nulls.clone());

    let (inferred, records) = format
        .infer_schema(Cursor::new(data), None)
        .context("inferring CSV schema")?;
    let schema = Arc::new(text_unless_numeric(&inferred));
    debug!(
        records,
        fields = ?schema
            .fields()
            .iter()
            .map(|f| (f.name(), f.data_type()))
            .collect::<Vec<_>>(),
        "inferred schema"
    );

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .with_quote(b'"')
        .with_delimiter(b',')
        .with_null_regex(nulls)
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(data))
        .context("creating CSV reader")?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context("reading CSV batches")?;
    concat_batches(&schema, &batches).context("concatenating CSV batches")
}

/// Keep Int64, Float64 and Boolean columns; anything else (dates, timestamps,
/// all-null columns) is read as text.
fn text_unless_numeric(schema: &Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| match f.data_type() {
            DataType::Int64 | DataType::Float64 | DataType::Boolean => f.as_ref().clone(),
            _ => Field::new(f.name(), DataType::Utf8, true),
        })
        .collect();
    Schema::new(fields)
}

fn load_parquet(path: &Path) -> Result<RecordBatch> {
    let file =
        File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).with_context(|| {
        format!(
            "failed to create RecordBatchReaderBuilder for `{}`",
            path.display()
        )
    })?;
    let schema = Arc::clone(builder.schema());
    let reader = builder
        .with_batch_size(BATCH_SIZE)
        .build()
        .with_context(|| format!("failed to build RecordBatchReader for `{}`", path.display()))?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to read batches from `{}`", path.display()))?;
    concat_batches(&schema, &batches).context("concatenating Parquet batches")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, StringArray};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn infers_types_and_reads_markers_as_null() -> Result<()> {
        let content = "Employee,Hours_Worked_Per_Day,Meetings_Per_Day,Productivity_Change\n\
                       a,6.392.393.639.805.820,3,1\n\
                       b,NA,4,0\n\
                       c,7.5,,1\n";
        let batch = load_csv_bytes(content.as_bytes())?;

        assert_eq!(batch.num_rows(), 3);
        let schema = batch.schema();
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Int64);
        assert_eq!(schema.field(3).data_type(), &DataType::Int64);

        let hours = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("hours as strings");
        assert_eq!(hours.value(0), "6.392.393.639.805.820");
        assert!(hours.is_null(1));
        assert!(batch.column(2).is_null(2));
        Ok(())
    }

    #[test]
    fn dates_and_timestamps_stay_text() -> Result<()> {
        let batch = load_csv_bytes(
            b"Recorded_At,Day,Hours
2020-03-01 09:30:00,2020-03-01,7.5
2020-03-02 10:00:00,2020-03-02,8
",
        )?;
        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);

        let recorded = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("timestamps as strings");
        assert_eq!(recorded.value(0), "2020-03-01 09:30:00");
        Ok(())
    }

    #[test]
    fn header_only_csv_is_an_empty_table() -> Result<()> {
        let batch = load_csv_bytes(b"State,Confirmed,Active,Deaths\n")?;
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 4);
        Ok(())
    }

    #[test]
    fn load_table_reads_from_disk() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(b"State,Confirmed\nKerala,100\nGoa,5\n")?;
        let batch = load_table(tmp.path())?;
        assert_eq!(batch.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_table("/nonexistent/state_level_latest.csv").unwrap_err();
        assert!(format!("{:#}", err).contains("state_level_latest.csv"));
    }
}
