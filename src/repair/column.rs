use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, BooleanArray, Float64Builder, StringArray},
    compute::filter_record_batch,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::{repair_value, RepairOutcome};
use crate::{
    config::RepairConfig,
    table::{is_missing_marker, to_utf8},
};

/// Per-column outcome counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnReport {
    pub column: String,
    pub clean: usize,
    pub repaired: usize,
    pub missing: usize,
    pub unparseable: usize,
}

impl ColumnReport {
    fn new(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &RepairOutcome) {
        match outcome {
            RepairOutcome::Clean(_) => self.clean += 1,
            RepairOutcome::Repaired(_) => self.repaired += 1,
            RepairOutcome::Missing => self.missing += 1,
            RepairOutcome::Unparseable(_) => self.unparseable += 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns: Vec<ColumnReport>,
}

impl RepairSummary {
    pub fn rows_dropped(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// Repair the configured target columns, then drop rows that are absent in
/// any required column.
pub fn repair_table(
    batch: &RecordBatch,
    cfg: &RepairConfig,
) -> Result<(RecordBatch, RepairSummary)> {
    let rows_in = batch.num_rows();
    let (repaired, columns) = repair_columns(batch, &cfg.target_columns)?;
    let complete = drop_incomplete(&repaired, &cfg.required_columns)?;

    let summary = RepairSummary {
        rows_in,
        rows_out: complete.num_rows(),
        columns,
    };
    info!(
        rows_in,
        rows_out = summary.rows_out,
        dropped = summary.rows_dropped(),
        "dropped incomplete rows"
    );
    Ok((complete, summary))
}

/// Replace every column named in `targets` with its Float64 repair.
/// Targets absent from the batch are skipped; other columns pass through.
pub fn repair_columns(
    batch: &RecordBatch,
    targets: &[String],
) -> Result<(RecordBatch, Vec<ColumnReport>)> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut cols = Vec::with_capacity(batch.num_columns());
    let mut reports = Vec::new();

    for (field, arr) in schema.fields().iter().zip(batch.columns()) {
        if !targets.contains(field.name()) {
            fields.push(Arc::clone(field));
            cols.push(Arc::clone(arr));
            continue;
        }

        let (fixed, report) = repair_array(arr, field.name())?;
        info!(
            column = %report.column,
            clean = report.clean,
            repaired = report.repaired,
            missing = report.missing,
            unparseable = report.unparseable,
            "repaired column"
        );
        fields.push(Arc::new(Field::new(field.name(), DataType::Float64, true)));
        cols.push(fixed);
        reports.push(report);
    }

    for target in targets {
        if schema.index_of(target).is_err() {
            debug!(column = %target, "target column not in table, skipping");
        }
    }

    let out = RecordBatch::try_new(Arc::new(Schema::new(fields)), cols)
        .context("building repaired batch")?;
    Ok((out, reports))
}

/// Repair every cell of one column into a nullable Float64 array.
pub fn repair_array(arr: &ArrayRef, column: &str) -> Result<(ArrayRef, ColumnReport)> {
    let sarr = to_utf8(arr).with_context(|| format!("casting {} to text", column))?;

    let mut report = ColumnReport::new(column);
    let mut b = Float64Builder::with_capacity(sarr.len());
    for opt in sarr.iter() {
        let outcome = repair_value(opt);
        if let RepairOutcome::Unparseable(ref raw) = outcome {
            debug!(column, value = %raw, "unparseable value");
        }
        report.record(&outcome);
        b.append_option(outcome.value());
    }
    Ok((Arc::new(b.finish()) as ArrayRef, report))
}

/// Keep only rows where every `required` column holds a value.
///
/// Nulls are absent; so are blank or missing-marker cells of string columns.
/// A required column that is not in the batch is an error.
pub fn drop_incomplete(batch: &RecordBatch, required: &[String]) -> Result<RecordBatch> {
    let mut keep = vec![true; batch.num_rows()];

    for name in required {
        let arr = batch
            .column_by_name(name)
            .ok_or_else(|| anyhow!("required column {} not found", name))?;
        let strings = arr.as_any().downcast_ref::<StringArray>();

        for (i, k) in keep.iter_mut().enumerate() {
            if !*k {
                continue;
            }
            let absent = match strings {
                Some(s) => s.is_null(i) || is_missing_marker(s.value(i)),
                None => arr.is_null(i),
            };
            if absent {
                *k = false;
            }
        }
    }

    let mask = BooleanArray::from(keep);
    filter_record_batch(batch, &mask).context("filtering incomplete rows")
}
