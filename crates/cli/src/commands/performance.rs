//! Performance CLI command.
//!
//! Reads a transaction ledger and a portfolio value history from CSV and
//! prints the performance report.

use anyhow::Result;
use clap::Args;
use risk_engine_backtest::{
    read_transactions, read_value_history, MetricsCalculator, MetricsFormatter,
};
use std::path::PathBuf;
use tracing::info;

/// Arguments for the performance command.
#[derive(Args, Debug, Clone)]
pub struct PerformanceArgs {
    /// Ledger CSV: date,symbol,kind,quantity,price[,realized_pnl[,cost_basis_per_unit]]
    #[arg(long)]
    pub ledger: PathBuf,

    /// Portfolio value CSV: date,value
    #[arg(long)]
    pub values: PathBuf,

    /// Print metrics as JSON instead of the text report
    #[arg(long)]
    pub json: bool,
}

/// Runs the performance command.
///
/// # Errors
/// Returns an error if either file cannot be read or parsed.
pub fn run_performance(args: &PerformanceArgs) -> Result<()> {
    let transactions = read_transactions(&args.ledger)?;
    let history = read_value_history(&args.values)?;

    info!(
        transactions = transactions.len(),
        snapshots = history.len(),
        "Calculating performance metrics"
    );
    let metrics = MetricsCalculator::calculate(&transactions, &history);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print!("{}", MetricsFormatter::format(&metrics));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn runs_over_csv_files() {
        let dir = TempDir::new().unwrap();
        let ledger = dir.path().join("ledger.csv");
        let values = dir.path().join("values.csv");
        std::fs::write(
            &ledger,
            "date,symbol,kind,quantity,price,realized_pnl\n\
             2024-01-01,BTC,buy,1,40000,\n\
             2024-01-05,BTC,sell,1,44000,4000\n",
        )
        .unwrap();
        std::fs::write(&values, "date,value\n2024-01-01,40000\n2024-01-05,44000\n").unwrap();

        let args = PerformanceArgs {
            ledger,
            values,
            json: true,
        };
        run_performance(&args).unwrap();
    }

    #[test]
    fn missing_ledger_is_an_error() {
        let dir = TempDir::new().unwrap();
        let args = PerformanceArgs {
            ledger: dir.path().join("absent.csv"),
            values: dir.path().join("absent_values.csv"),
            json: false,
        };
        assert!(run_performance(&args).is_err());
    }
}
