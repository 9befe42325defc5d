//! Backfill CLI command.
//!
//! Replays a price history through confidence tracking as if the asset had
//! been scored once per day: each day is scored against a regression fitted
//! only on the prices up to that day. Snapshots taken early in the replay are
//! graded by later days, so a long history seeds the accuracy bonus.

use anyhow::{Context, Result};
use clap::Args;
use risk_engine_core::{utc_day, PricePoint};
use risk_engine_data::CsvStorage;
use risk_engine_signals::{
    regression, CalculationInput, SupplementaryIndicators, MIN_REGRESSION_POINTS,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::context::EngineContext;

/// Arguments for the backfill command.
#[derive(Args, Debug, Clone)]
pub struct BackfillArgs {
    /// Asset symbol or CoinGecko id (e.g., "SOL", "solana")
    #[arg(long)]
    pub asset: String,

    /// Price history CSV with `date,price` columns
    #[arg(long)]
    pub prices: PathBuf,

    /// Days of history required before the first replayed score
    #[arg(long, default_value_t = MIN_REGRESSION_POINTS)]
    pub warmup_days: usize,
}

/// Keeps the last price of each UTC day. Input must be sorted by date.
fn daily_closes(prices: &[PricePoint]) -> Vec<PricePoint> {
    let mut daily: Vec<PricePoint> = Vec::new();
    for point in prices {
        match daily.last_mut() {
            Some(last) if utc_day(&last.date) == utc_day(&point.date) => *last = *point,
            _ => daily.push(*point),
        }
    }
    daily
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ReplaySummary {
    scored: usize,
    snapshots: usize,
    resolved: usize,
}

/// Runs the backfill command.
///
/// # Errors
/// Returns an error if the asset is unknown, the prices cannot be read, or
/// the final flush of confidence metrics fails.
pub async fn run_backfill(args: BackfillArgs, ctx: &EngineContext) -> Result<()> {
    let asset = ctx.resolve(&args.asset)?.clone();
    let prices = CsvStorage::read_prices(&args.prices)
        .with_context(|| format!("Failed to read prices from {}", args.prices.display()))?;
    let daily = daily_closes(&prices);

    let tracker = Arc::new(ctx.tracker().await);
    let stop = Arc::new(AtomicBool::new(false));
    let flusher =
        Arc::clone(&tracker).spawn_flush_task(tracker.flush_interval(), Arc::clone(&stop));

    let warmup = args.warmup_days.max(MIN_REGRESSION_POINTS);
    let inputs = SupplementaryIndicators::default();
    let mut summary = ReplaySummary::default();

    for end in warmup..=daily.len() {
        let window = &daily[..end];
        let Some(fit) = regression::fit(window, asset.origin_date) else {
            continue;
        };
        let today = window[end - 1];
        let point = ctx
            .aggregator
            .calculate_with_regression(&asset, &fit, today.price, today.date, &inputs);

        let outcome = tracker
            .record_calculation(CalculationInput::from_point(&asset.asset_id, &fit, &point))
            .await?;

        summary.scored += 1;
        summary.snapshots += usize::from(outcome.snapshot_recorded);
        summary.resolved += outcome.predictions_resolved;
    }

    stop.store(true, Ordering::Relaxed);
    flusher.await.context("Confidence flush task panicked")?;
    // The task logs rather than returns flush errors
    tracker.flush().await?;

    let confidence = tracker.compute_confidence(&asset.asset_id).await?;
    info!(
        asset = %asset.asset_id,
        days = daily.len(),
        scored = summary.scored,
        snapshots = summary.snapshots,
        resolved = summary.resolved,
        "Backfill complete"
    );

    println!(
        "{}: replayed {} days, {} snapshots, {} graded",
        asset.asset_id, summary.scored, summary.snapshots, summary.resolved
    );
    println!(
        "Confidence: {} (static {}, raw {:.2})",
        confidence.adaptive_confidence, confidence.static_confidence, confidence.raw_score
    );
    Ok(())
}
