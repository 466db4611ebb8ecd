use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::impute::{MissingRegions, ReferenceTable};

/// Settings for both tools. Every field defaults to the values the
/// original scripts hardcoded, so an empty config file changes nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub repair: RepairConfig,
    pub impute: ImputeConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Columns whose cells get repaired into floats.
    pub target_columns: Vec<String>,
    /// Rows absent in any of these are dropped.
    pub required_columns: Vec<String>,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("covid_impact_on_work new.csv"),
            output: PathBuf::from("cleaned_data.csv"),
            target_columns: strings(&["Hours_Worked_Per_Day", "Meetings_Per_Day"]),
            required_columns: strings(&[
                "Hours_Worked_Per_Day",
                "Meetings_Per_Day",
                "Productivity_Change",
            ]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputeConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub region_column: String,
    /// Source population column, read only by the `detect` policy.
    pub population_column: String,
    pub metrics: Vec<String>,
    pub reference: ReferenceTable,
    pub missing: MissingConfig,
}

impl Default for ImputeConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("state_level_latest.csv"),
            output: PathBuf::from("state_data.csv"),
            region_column: "State".into(),
            population_column: "Population".into(),
            metrics: strings(&["Confirmed", "Active", "Deaths"]),
            reference: ReferenceTable::default(),
            missing: MissingConfig::default(),
        }
    }
}

/// Which regions get synthesized metrics.
///
/// With `detect: true` the regions whose source population is absent or
/// zero are missing and `designated` is ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingConfig {
    pub detect: bool,
    pub designated: Vec<String>,
}

impl Default for MissingConfig {
    fn default() -> Self {
        Self {
            detect: false,
            designated: strings(&["Odisha", "Uttarakhand", "Mizoram"]),
        }
    }
}

impl MissingConfig {
    pub fn policy(&self) -> MissingRegions {
        if self.detect {
            MissingRegions::Detected
        } else {
            MissingRegions::Designated(self.designated.clone())
        }
    }
}

impl Config {
    /// Load from YAML, or JSON when the extension is `.json`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(&text)
                .with_context(|| format!("parsing JSON config {}", path.display()))
        } else {
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing YAML config {}", path.display()))
        }
    }

    /// `Config::load(path)` when a path is given, else the defaults.
    pub fn from_arg(arg: Option<&str>) -> Result<Self> {
        match arg {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn defaults_match_original_paths() {
        let cfg = Config::default();
        assert_eq!(cfg.repair.input, PathBuf::from("covid_impact_on_work new.csv"));
        assert_eq!(cfg.repair.output, PathBuf::from("cleaned_data.csv"));
        assert_eq!(cfg.impute.input, PathBuf::from("state_level_latest.csv"));
        assert_eq!(cfg.impute.output, PathBuf::from("state_data.csv"));
        assert_eq!(
            cfg.impute.missing.policy(),
            MissingRegions::Designated(strings(&["Odisha", "Uttarakhand", "Mizoram"]))
        );
        assert_eq!(cfg.impute.reference.get("Odisha"), Some(46_356_334));
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() -> Result<()> {
        let mut tmp = Builder::new().suffix(".yaml").tempfile()?;
        writeln!(
            tmp,
            "repair:\n  output: out/clean.parquet\nimpute:\n  missing:\n    detect: true\n  reference:\n    Atlantis: 1000\n"
        )?;
        let cfg = Config::load(tmp.path())?;

        assert_eq!(cfg.repair.output, PathBuf::from("out/clean.parquet"));
        assert_eq!(cfg.repair.input, RepairConfig::default().input);
        assert_eq!(cfg.impute.missing.policy(), MissingRegions::Detected);
        assert_eq!(cfg.impute.reference.get("Atlantis"), Some(1000));
        assert_eq!(cfg.impute.reference.get("Kerala"), None);
        assert_eq!(cfg.impute.metrics, ImputeConfig::default().metrics);
        Ok(())
    }

    #[test]
    fn json_config_is_accepted() -> Result<()> {
        let mut tmp = Builder::new().suffix(".json").tempfile()?;
        write!(
            tmp,
            r#"{{"impute": {{"missing": {{"designated": ["Goa"]}}}}}}"#
        )?;
        let cfg = Config::load(tmp.path())?;
        assert_eq!(
            cfg.impute.missing.policy(),
            MissingRegions::Designated(vec!["Goa".into()])
        );
        Ok(())
    }

    #[test]
    fn no_argument_means_defaults() -> Result<()> {
        assert_eq!(Config::from_arg(None)?, Config::default());
        Ok(())
    }

    #[test]
    fn bad_config_reports_path() {
        let err = Config::load("/nonexistent/covidprep.yaml").unwrap_err();
        assert!(err.to_string().contains("covidprep.yaml"));
    }
}
