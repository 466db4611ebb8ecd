use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Int64Array, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::table::{clean_str, is_missing_marker, to_utf8};

/// One region row: name, population and one count per metric.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionRecord {
    pub name: String,
    pub population: Option<u64>,
    /// Same order as [`RegionTable::metrics`].
    pub metrics: Vec<Option<i64>>,
}

/// Regions plus the column names they were read with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionTable {
    pub region_column: String,
    pub metrics: Vec<String>,
    pub rows: Vec<RegionRecord>,
}

impl RegionTable {
    /// Read regions out of a loaded table.
    ///
    /// `population` comes from `population_column` when the table has one.
    /// Rows with a blank region name are skipped.
    pub fn from_batch(
        batch: &RecordBatch,
        region_column: &str,
        population_column: &str,
        metrics: &[String],
    ) -> Result<Self> {
        let names = column_as_text(batch, region_column)?;
        let populations = match batch.column_by_name(population_column) {
            Some(arr) => Some(to_utf8(arr).context("reading population column")?),
            None => None,
        };
        let metric_cols = metrics
            .iter()
            .map(|m| column_as_text(batch, m))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let name = match names.is_valid(i).then(|| clean_str(names.value(i))) {
                Some(n) if !n.is_empty() => n,
                _ => {
                    debug!(row = i, "skipping row without region name");
                    continue;
                }
            };
            let population = populations
                .as_ref()
                .and_then(|p| cell(p, i))
                .and_then(parse_count)
                .and_then(|v| u64::try_from(v).ok());
            let counts = metrics
                .iter()
                .zip(&metric_cols)
                .map(|(metric, col)| read_count(&name, metric, cell(col, i)))
                .collect();
            rows.push(RegionRecord {
                name,
                population,
                metrics: counts,
            });
        }

        Ok(Self {
            region_column: region_column.to_string(),
            metrics: metrics.to_vec(),
            rows,
        })
    }

    /// Output layout: region name, `Population`, then one Int64 column per metric.
    pub fn schema(&self) -> Schema {
        let mut fields = vec![
            Field::new(&self.region_column, DataType::Utf8, false),
            Field::new("Population", DataType::UInt64, true),
        ];
        fields.extend(
            self.metrics
                .iter()
                .map(|m| Field::new(m, DataType::Int64, true)),
        );
        Schema::new(fields)
    }

    pub fn to_batch(&self) -> Result<RecordBatch> {
        let mut cols: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.name.as_str()),
            )),
            Arc::new(UInt64Array::from_iter(self.rows.iter().map(|r| r.population))),
        ];
        for idx in 0..self.metrics.len() {
            let values = self
                .rows
                .iter()
                .map(|r| r.metrics.get(idx).copied().flatten());
            cols.push(Arc::new(Int64Array::from_iter(values)));
        }
        RecordBatch::try_new(Arc::new(self.schema()), cols).context("building region batch")
    }

    pub fn get(&self, name: &str) -> Option<&RegionRecord> {
        self.rows.iter().find(|r| r.name == name)
    }
}

fn column_as_text(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let arr = batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("column {} not found", name))?;
    to_utf8(arr).with_context(|| format!("reading column {}", name))
}

fn cell(arr: &StringArray, i: usize) -> Option<&str> {
    arr.is_valid(i).then(|| arr.value(i))
}

/// How a count cell was read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Count {
    /// Integer value, possibly with thousands separators.
    Exact(i64),
    /// Fractional value cut to its integer part.
    Truncated(i64),
    Missing,
    /// Not a number; read as empty.
    Invalid,
}

impl Count {
    pub fn value(self) -> Option<i64> {
        match self {
            Count::Exact(v) | Count::Truncated(v) => Some(v),
            Count::Missing | Count::Invalid => None,
        }
    }
}

/// Classify a count cell: thousands separators are dropped, fractions truncated.
pub fn classify_count(raw: &str) -> Count {
    if is_missing_marker(raw) {
        return Count::Missing;
    }
    let digits: String = clean_str(raw).chars().filter(|c| *c != ',').collect();
    if let Ok(v) = digits.parse::<i64>() {
        return Count::Exact(v);
    }
    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() < i64::MAX as f64 => {
            if v.fract() == 0.0 {
                Count::Exact(v as i64)
            } else {
                Count::Truncated(v.trunc() as i64)
            }
        }
        _ => Count::Invalid,
    }
}

pub fn parse_count(raw: &str) -> Option<i64> {
    classify_count(raw).value()
}

/// Metric cell of one region; cells that do not survive as-is are logged.
fn read_count(region: &str, metric: &str, raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    let count = classify_count(raw);
    match count {
        Count::Truncated(v) => {
            warn!(region, metric, raw, value = v, "fractional count truncated")
        }
        Count::Invalid => warn!(region, metric, raw, "count is not a number; left empty"),
        Count::Exact(_) | Count::Missing => {}
    }
    count.value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::read::load_csv_bytes;

    fn metrics() -> Vec<String> {
        vec!["Confirmed".into(), "Active".into(), "Deaths".into()]
    }

    #[test]
    fn counts_accept_separators_and_floats() {
        assert_eq!(parse_count("6,605,229"), Some(6_605_229));
        assert_eq!(parse_count(" 42 "), Some(42));
        assert_eq!(parse_count("12.9"), Some(12));
        assert_eq!(parse_count("NA"), None);
        assert_eq!(parse_count("lots"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn count_cells_are_classified() {
        assert_eq!(classify_count("1,024"), Count::Exact(1024));
        assert_eq!(classify_count("12.0"), Count::Exact(12));
        assert_eq!(classify_count("12.9"), Count::Truncated(12));
        assert_eq!(classify_count("n/a"), Count::Missing);
        assert_eq!(classify_count("pending"), Count::Invalid);
        assert_eq!(classify_count("1e300"), Count::Invalid);
    }

    #[test]
    fn unparseable_metric_cell_reads_as_empty() -> Result<()> {
        let batch = load_csv_bytes(
            b"State,Confirmed,Active,Deaths
Kerala,6870000,pending,71000
Goa,259000.7,100,4000
",
        )?;
        let table = RegionTable::from_batch(&batch, "State", "Population", &metrics())?;
        assert_eq!(
            table.get("Kerala").unwrap().metrics,
            vec![Some(6_870_000), None, Some(71_000)]
        );
        assert_eq!(table.get("Goa").unwrap().metrics[0], Some(259_000));
        Ok(())
    }

    #[test]
    fn reads_regions_from_state_csv() -> Result<()> {
        let batch = load_csv_bytes(
            b"State,Confirmed,Recovered,Deaths,Active,State_code\n\
              Total,\"44,690,738\",44150289,530779,4517,TT\n\
              \" Kerala \",6870000,6797000,71000,2000,KL\n\
              ,1,1,1,1,XX\n\
              Goa,259000,255000,4000,NA,GA\n",
        )?;
        let table = RegionTable::from_batch(&batch, "State", "Population", &metrics())?;

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].metrics, vec![Some(44_690_738), Some(4517), Some(530_779)]);
        let kerala = table.get("Kerala").expect("trimmed name");
        assert_eq!(kerala.population, None);
        assert_eq!(kerala.metrics, vec![Some(6_870_000), Some(2000), Some(71_000)]);
        assert_eq!(table.get("Goa").unwrap().metrics[1], None);
        Ok(())
    }

    #[test]
    fn source_population_is_read_when_present() -> Result<()> {
        let batch = load_csv_bytes(
            b"State,Population,Confirmed,Active,Deaths\nGoa,1569923,10,2,1\nOdisha,,5,1,0\nSikkim,-3,1,1,1\n",
        )?;
        let table = RegionTable::from_batch(&batch, "State", "Population", &metrics())?;
        assert_eq!(table.rows[0].population, Some(1_569_923));
        assert_eq!(table.rows[1].population, None);
        assert_eq!(table.rows[2].population, None);
        Ok(())
    }

    #[test]
    fn missing_metric_column_is_an_error() -> Result<()> {
        let batch = load_csv_bytes(b"State,Confirmed\nGoa,1\n")?;
        let err = RegionTable::from_batch(&batch, "State", "Population", &metrics()).unwrap_err();
        assert!(err.to_string().contains("Active"));
        Ok(())
    }

    #[test]
    fn to_batch_has_fixed_column_layout() -> Result<()> {
        let table = RegionTable {
            region_column: "State".into(),
            metrics: metrics(),
            rows: vec![RegionRecord {
                name: "Kerala".into(),
                population: Some(35_699_443),
                metrics: vec![Some(1), None, Some(3)],
            }],
        };
        let batch = table.to_batch()?;
        let names: Vec<&str> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, vec!["State", "Population", "Confirmed", "Active", "Deaths"]);
        assert!(batch.column(3).is_null(0));

        let back = RegionTable::from_batch(&batch, "State", "Population", &metrics())?;
        assert_eq!(back, table);
        Ok(())
    }
}
