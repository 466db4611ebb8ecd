use anyhow::{Context, Result};
use covidprep::{logging::init_logging, repair, table, Config};
use std::{env, time::Instant};
use tracing::info;

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    init_logging();

    // ─── 2) load config (optional single argument) ────────────────────
    let arg = env::args().nth(1);
    let cfg = Config::from_arg(arg.as_deref())?.repair;
    info!(input = %cfg.input.display(), output = %cfg.output.display(), "repair_numbers startup");

    // ─── 3) load, transform, save ─────────────────────────────────────
    let start = Instant::now();
    let raw = table::load_table(&cfg.input)?;
    let (cleaned, summary) = repair::repair_table(&raw, &cfg)
        .with_context(|| format!("repairing {}", cfg.input.display()))?;
    table::save_table(&cleaned, &cfg.output)?;

    // ─── 4) summary ───────────────────────────────────────────────────
    info!(
        rows_in = summary.rows_in,
        rows_out = summary.rows_out,
        elapsed = ?start.elapsed(),
        "cleaned data saved to {}",
        cfg.output.display()
    );
    Ok(())
}
