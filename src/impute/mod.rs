//! Population-proportional back-fill of metrics for regions whose population
//! data is unreliable.

pub mod reference;
pub mod region;

use anyhow::{anyhow, bail, Context, Result};
use arrow::record_batch::RecordBatch;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::ImputeConfig;

pub use reference::ReferenceTable;
pub use region::{RegionRecord, RegionTable};

/// How the missing regions are chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MissingRegions {
    /// A fixed list of names, synthesized whether or not they occur in the source.
    Designated(Vec<String>),
    /// Regions whose source population is absent or zero.
    Detected,
}

/// Per-capita rate of one metric over the known regions.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricRate {
    pub metric: String,
    pub total: i64,
    pub rate: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Imputation {
    /// Known regions in source order, then the synthesized ones.
    pub table: RegionTable,
    pub rates: Vec<MetricRate>,
    /// Population summed over the known regions that have one.
    pub known_population: u64,
    pub synthesized: Vec<String>,
}

/// Back-fill metrics of the missing regions from the known ones.
///
/// 1. every region gets its reference population (source value as fallback)
/// 2. metrics are summed over all known regions, population over the known
///    regions that have one
/// 3. rate = Σ metric / Σ population
/// 4. missing metric = ⌊population × rate⌋, computed on integers
pub fn impute(
    source: &RegionTable,
    reference: &ReferenceTable,
    missing: &MissingRegions,
) -> Result<Imputation> {
    let missing_names = missing_region_names(source, missing);
    let is_missing: HashSet<&str> = missing_names.iter().map(String::as_str).collect();

    // 1) known regions keep their metrics, population from the reference
    let mut rows: Vec<RegionRecord> = Vec::with_capacity(source.rows.len());
    for row in source.rows.iter().filter(|r| !is_missing.contains(r.name.as_str())) {
        let population = reference.get(&row.name).or(row.population);
        if population.is_none() {
            warn!(region = %row.name, "no reference population; counted in metric totals only");
        }
        rows.push(RegionRecord {
            name: row.name.clone(),
            population,
            metrics: row.metrics.clone(),
        });
    }

    // 2) totals over the known regions
    let known_population: u64 = rows.iter().filter_map(|r| r.population).sum();
    if known_population == 0 {
        bail!("no known region with a population to derive per-capita rates from");
    }
    let totals: Vec<i64> = (0..source.metrics.len())
        .map(|idx| {
            rows.iter()
                .filter_map(|r| r.metrics.get(idx).copied().flatten())
                .sum()
        })
        .collect();

    let rates: Vec<MetricRate> = source
        .metrics
        .iter()
        .zip(&totals)
        .map(|(metric, &total)| MetricRate {
            metric: metric.clone(),
            total,
            rate: total as f64 / known_population as f64,
        })
        .collect();
    for r in &rates {
        info!(metric = %r.metric, total = r.total, rate = r.rate, "per-capita rate");
    }

    // 3) synthesize the missing regions
    for name in &missing_names {
        let population = reference
            .get(name)
            .ok_or_else(|| anyhow!("missing region {} has no reference population", name))?;
        let metrics = totals
            .iter()
            .map(|&total| scale(population, total, known_population).map(Some))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("synthesizing {}", name))?;
        rows.push(RegionRecord {
            name: name.clone(),
            population: Some(population),
            metrics,
        });
    }

    info!(
        known = rows.len() - missing_names.len(),
        synthesized = missing_names.len(),
        known_population,
        "imputed regions"
    );

    Ok(Imputation {
        table: RegionTable {
            region_column: source.region_column.clone(),
            metrics: source.metrics.clone(),
            rows,
        },
        rates,
        known_population,
        synthesized: missing_names,
    })
}

/// Load regions from `batch`, impute, and return the output table.
pub fn impute_table(
    batch: &RecordBatch,
    cfg: &ImputeConfig,
) -> Result<(RecordBatch, Imputation)> {
    let source = RegionTable::from_batch(
        batch,
        &cfg.region_column,
        &cfg.population_column,
        &cfg.metrics,
    )?;
    let imputation = impute(&source, &cfg.reference, &cfg.missing.policy())?;
    let out = imputation.table.to_batch()?;
    Ok((out, imputation))
}

fn missing_region_names(source: &RegionTable, missing: &MissingRegions) -> Vec<String> {
    let candidates: Vec<String> = match missing {
        MissingRegions::Designated(names) => {
            for name in names {
                if source.get(name).is_none() {
                    warn!(region = %name, "designated region not in source; synthesizing anyway");
                }
            }
            names.clone()
        }
        MissingRegions::Detected => source
            .rows
            .iter()
            .filter(|r| matches!(r.population, None | Some(0)))
            .map(|r| r.name.clone())
            .collect(),
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

/// ⌊population × total / known_population⌋, truncating toward zero.
fn scale(population: u64, total: i64, known_population: u64) -> Result<i64> {
    let v = population as i128 * total as i128 / known_population as i128;
    i64::try_from(v).map_err(|_| anyhow!("scaled count {} does not fit in i64", v))
}
