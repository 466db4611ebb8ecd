use anyhow::{Context, Result};
use covidprep::{impute, logging::init_logging, table, Config};
use std::{env, time::Instant};
use tracing::info;

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    init_logging();

    // ─── 2) load config (optional single argument) ────────────────────
    let arg = env::args().nth(1);
    let cfg = Config::from_arg(arg.as_deref())?.impute;
    info!(
        input = %cfg.input.display(),
        output = %cfg.output.display(),
        reference_regions = cfg.reference.len(),
        "impute_population startup"
    );

    // ─── 3) load, transform, save ─────────────────────────────────────
    let start = Instant::now();
    let raw = table::load_table(&cfg.input)?;
    let (filled, imputation) = impute::impute_table(&raw, &cfg)
        .with_context(|| format!("imputing {}", cfg.input.display()))?;
    table::save_table(&filled, &cfg.output)?;

    // ─── 4) summary ───────────────────────────────────────────────────
    info!(
        regions = filled.num_rows(),
        synthesized = ?imputation.synthesized,
        elapsed = ?start.elapsed(),
        "filled data saved to {}",
        cfg.output.display()
    );
    Ok(())
}
