//! History CLI command.
//!
//! Projects a price history onto one regression-only risk point per UTC day
//! and writes the series as CSV.

use anyhow::{bail, Context, Result};
use clap::Args;
use risk_engine_data::CsvStorage;
use std::path::PathBuf;
use tracing::info;

use crate::context::EngineContext;

/// Arguments for the history command.
#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Asset symbol or CoinGecko id (e.g., "ETH", "ethereum")
    #[arg(long)]
    pub asset: String,

    /// Price history CSV with `date,price` columns
    #[arg(long)]
    pub prices: PathBuf,

    /// Output CSV path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also merge the series into the stored risk history
    #[arg(long)]
    pub persist: bool,
}

/// Runs the history command.
///
/// # Errors
/// Returns an error if the asset is unknown, the prices cannot be read or
/// fitted, or the output cannot be written.
pub fn run_history(args: &HistoryArgs, ctx: &EngineContext) -> Result<()> {
    let asset = ctx.resolve(&args.asset)?;
    let prices = CsvStorage::read_prices(&args.prices)
        .with_context(|| format!("Failed to read prices from {}", args.prices.display()))?;

    let series = ctx.aggregator.calculate_history(asset, &prices);
    if series.is_empty() {
        bail!(
            "Could not fit a regression for {} from {} price rows",
            asset.asset_id,
            prices.len()
        );
    }

    match &args.output {
        Some(path) => CsvStorage::write_risk_history(path, &series)?,
        None => CsvStorage::write_risk_history_to(std::io::stdout().lock(), &series)?,
    }

    if args.persist {
        ctx.history_store()
            .upsert_many(&asset.asset_id, series.iter().cloned())?;
    }

    info!(
        asset = %asset.asset_id,
        days = series.len(),
        first = %series[0].date_string,
        last = %series[series.len() - 1].date_string,
        "Built risk history"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context_in;
    use chrono::{Duration, TimeZone, Utc};
    use std::fmt::Write as _;
    use tempfile::TempDir;

    #[test]
    fn writes_one_row_per_day_and_persists() {
        let dir = TempDir::new().unwrap();
        let ctx = context_in(&dir);

        let start = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
        let mut csv = String::from("date,price\n");
        for i in 0..30 {
            let morning = start + Duration::days(i);
            let evening = morning + Duration::hours(18);
            writeln!(csv, "{},{}", morning.to_rfc3339(), 1_500.0 + i as f64).unwrap();
            writeln!(csv, "{},{}", evening.to_rfc3339(), 1_510.0 + i as f64).unwrap();
        }
        let prices = dir.path().join("eth.csv");
        std::fs::write(&prices, csv).unwrap();

        let output = dir.path().join("eth_risk.csv");
        let args = HistoryArgs {
            asset: "ethereum".to_string(),
            prices,
            output: Some(output.clone()),
            persist: true,
        };
        run_history(&args, &ctx).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written.lines().count(), 31);
        assert!(written.lines().nth(1).unwrap().starts_with("2022-06-01,"));

        let stored = ctx.history_store().load("ETH").unwrap();
        assert_eq!(stored.len(), 30);
        assert!((stored[0].price - 1_510.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unfittable_history_is_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = context_in(&dir);
        let prices = dir.path().join("few.csv");
        std::fs::write(&prices, "date,price\n2024-01-01,1\n").unwrap();

        let args = HistoryArgs {
            asset: "ETH".to_string(),
            prices,
            output: None,
            persist: false,
        };
        assert!(run_history(&args, &ctx).is_err());
    }
}
