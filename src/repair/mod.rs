//! Repair of numeric cells that were corrupted into concatenated decimals,
//! e.g. `"6.392.393.639.805.820"`.
//!
//! Only the first `digits.digits` group of a corrupted cell is trusted. Whether
//! that group is always the original value is an assumption about the source
//! data; [`RepairOutcome::Repaired`] keeps those cells countable apart from
//! clean ones.

pub mod column;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::table::is_missing_marker;

pub use column::{drop_incomplete, repair_columns, repair_table, ColumnReport, RepairSummary};

static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.\d+").expect("decimal pattern"));

/// What happened to a single cell.
#[derive(Clone, Debug, PartialEq)]
pub enum RepairOutcome {
    /// The whole cell already was a number.
    Clean(f64),
    /// The first decimal group was kept and the rest of the cell dropped.
    Repaired(f64),
    /// Null cell or missing marker.
    Missing,
    /// Neither a decimal group nor a number; carries the trimmed text.
    Unparseable(String),
}

impl RepairOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            RepairOutcome::Clean(v) | RepairOutcome::Repaired(v) => Some(*v),
            RepairOutcome::Missing | RepairOutcome::Unparseable(_) => None,
        }
    }
}

/// Repair one cell (`None` is a null cell).
pub fn repair_value(raw: Option<&str>) -> RepairOutcome {
    let Some(raw) = raw else {
        return RepairOutcome::Missing;
    };
    if is_missing_marker(raw) {
        return RepairOutcome::Missing;
    }
    let s = raw.trim();

    if let Some(m) = DECIMAL_RE.find(s) {
        return match m.as_str().parse::<f64>() {
            Ok(v) if m.as_str() == s => RepairOutcome::Clean(v),
            Ok(v) => RepairOutcome::Repaired(v),
            Err(_) => RepairOutcome::Unparseable(s.to_string()),
        };
    }

    match s.parse::<f64>() {
        Ok(v) if v.is_nan() => RepairOutcome::Missing,
        Ok(v) => RepairOutcome::Clean(v),
        Err(_) => RepairOutcome::Unparseable(s.to_string()),
    }
}
