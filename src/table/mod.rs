pub mod read;
pub mod utils;
pub mod write;

use std::path::Path;

pub use read::load_table;
pub use utils::{clean_str, is_missing_marker, to_utf8, MISSING_MARKERS};
pub use write::save_table;

/// On-disk table formats, picked from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// `.parquet` (any case) is Parquet, everything else is CSV.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
        {
            Some(ext) if ext == "parquet" => TableFormat::Parquet,
            _ => TableFormat::Csv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(TableFormat::from_path("state_data.csv"), TableFormat::Csv);
        assert_eq!(TableFormat::from_path("out/clean.PARQUET"), TableFormat::Parquet);
        assert_eq!(
            TableFormat::from_path("covid_impact_on_work new.csv"),
            TableFormat::Csv
        );
        assert_eq!(TableFormat::from_path("no_extension"), TableFormat::Csv);
    }
}
