use anyhow::{Context, Result};
use arrow::{csv::WriterBuilder, record_batch::RecordBatch};
use parquet::{
    arrow::ArrowWriter,
    basic::{BrotliLevel, Compression},
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

use super::TableFormat;

/// Write `batch` to `path` as CSV (with header) or Parquet.
///
/// The table is written to a hidden sibling file first and renamed over
/// `path`, so a failed run leaves any previous output untouched.
/// Returns the number of bytes written.
#[tracing::instrument(level = "info", skip(batch, path), fields(path = %path.as_ref().display()))]
pub fn save_table<P: AsRef<Path>>(batch: &RecordBatch, path: P) -> Result<u64> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let tmp_path = tmp_path_for(path);
    let written = match TableFormat::from_path(path) {
        TableFormat::Csv => write_csv(batch, &tmp_path),
        TableFormat::Parquet => write_parquet(batch, &tmp_path),
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "renaming {} to {}",
            tmp_path.display(),
            path.display()
        )
    })?;

    let size = fs::metadata(path)
        .with_context(|| format!("getting metadata of {}", path.display()))?
        .len();
    info!(rows = batch.num_rows(), bytes = size, "wrote table");
    Ok(size)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "table".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating file {}", path.display()))?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .build(BufWriter::new(file));
    writer.write(batch).context("writing batch to CSV")?;

    let mut out = writer.into_inner();
    out.flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating file {}", path.display()))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
