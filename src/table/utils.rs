use anyhow::{anyhow, Result};
use arrow::{
    array::{ArrayRef, StringArray},
    compute::cast,
    datatypes::DataType,
};
use regex::Regex;

/// Cell texts treated as missing values, on read and during repair.
/// Same token set pandas' `read_csv` treats as NaN by default.
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True if the trimmed cell is one of [`MISSING_MARKERS`].
pub fn is_missing_marker(raw: &str) -> bool {
    let trimmed = raw.trim();
    MISSING_MARKERS.contains(&trimmed)
}

/// Anchored alternation over [`MISSING_MARKERS`], handed to the Arrow CSV reader.
pub fn missing_marker_regex() -> Regex {
    let alternatives: Vec<String> = MISSING_MARKERS.iter().map(|m| regex::escape(m)).collect();
    let pattern = format!(r"^\s*(?:{})\s*$", alternatives.join("|"));
    // every alternative is escaped, so the pattern is always valid
    Regex::new(&pattern).expect("missing-marker pattern")
}

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Any column as a `StringArray`; non-string columns are cast to their text form.
pub fn to_utf8(arr: &ArrayRef) -> Result<StringArray> {
    let text = match arr.data_type() {
        DataType::Utf8 => arr.clone(),
        _ => cast(arr, &DataType::Utf8)?,
    };
    text.as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| anyhow!("column of type {} did not cast to Utf8", arr.data_type()))
}
