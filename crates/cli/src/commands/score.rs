//! Score CLI command.
//!
//! Fits the asset's regression over a price history CSV, scores one price
//! with any indicator readings passed as flags, and prints the composite
//! risk point as JSON. Unless `--dry-run` is set the point is merged into
//! the asset's risk history and recorded for confidence tracking.

use anyhow::{bail, Context, Result};
use clap::Args;
use risk_engine_core::parse_date;
use risk_engine_data::CsvStorage;
use risk_engine_signals::{
    regression, CalculationInput, ConfidenceBreakdown, MultiFactorRiskPoint,
    SupplementaryIndicators, MIN_REGRESSION_POINTS,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::context::EngineContext;

/// Arguments for the score command.
#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Asset symbol or CoinGecko id (e.g., "BTC", "bitcoin")
    #[arg(long)]
    pub asset: String,

    /// Price history CSV with `date,price` columns
    #[arg(long)]
    pub prices: PathBuf,

    /// Price to score (default: last price in the history)
    #[arg(long)]
    pub price: Option<f64>,

    /// Date to score at, RFC 3339 or YYYY-MM-DD (default: last history date)
    #[arg(long)]
    pub date: Option<String>,

    /// 14-period RSI, 0-100
    #[arg(long)]
    pub rsi: Option<f64>,

    /// 200-day simple moving average
    #[arg(long = "sma200")]
    pub sma_200: Option<f64>,

    /// Perpetual funding rate as a fraction (e.g., 0.0001)
    #[arg(long, allow_negative_numbers = true)]
    pub funding_rate: Option<f64>,

    /// Fear & greed index, 0-100
    #[arg(long)]
    pub fear_greed: Option<f64>,

    /// Current VIX level
    #[arg(long)]
    pub vix: Option<f64>,

    /// Current DXY level
    #[arg(long)]
    pub dxy: Option<f64>,

    /// Bull market support band values, e.g. --bull-bands 52000,54000
    #[arg(long, value_delimiter = ',')]
    pub bull_bands: Vec<f64>,

    /// Print the score without writing history or confidence metrics
    #[arg(long)]
    pub dry_run: bool,
}

impl ScoreArgs {
    /// Collects the indicator flags.
    ///
    /// # Errors
    /// Returns an error if `--bull-bands` is given without exactly two values.
    pub fn indicators(&self) -> Result<SupplementaryIndicators> {
        let mut inputs = SupplementaryIndicators {
            rsi: self.rsi,
            sma_200: self.sma_200,
            funding_rate: self.funding_rate,
            fear_greed: self.fear_greed,
            vix: self.vix,
            dxy: self.dxy,
            ..SupplementaryIndicators::default()
        };

        match self.bull_bands.as_slice() {
            [] => {}
            [band_a, band_b] => inputs.bull_market_bands = Some((*band_a, *band_b)),
            other => bail!(
                "--bull-bands takes exactly two values, got {}",
                other.len()
            ),
        }
        Ok(inputs)
    }
}

#[derive(Serialize)]
struct ScoreReport<'a> {
    asset: &'a str,
    category: &'static str,
    #[serde(flatten)]
    point: &'a MultiFactorRiskPoint,
    r_squared: f64,
    regression_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<ConfidenceBreakdown>,
}

/// Runs the score command.
///
/// # Errors
/// Returns an error if the asset is unknown, the price file cannot be read
/// or is too short to fit, or persisting the result fails.
pub async fn run_score(args: ScoreArgs, ctx: &EngineContext) -> Result<()> {
    let asset = ctx.resolve(&args.asset)?;
    let inputs = args.indicators()?;

    let history = CsvStorage::read_prices(&args.prices)
        .with_context(|| format!("Failed to read prices from {}", args.prices.display()))?;
    let last = history
        .last()
        .with_context(|| format!("{} has no price rows", args.prices.display()))?;

    let price = args.price.unwrap_or(last.price);
    let date = match &args.date {
        Some(raw) => parse_date(raw).with_context(|| format!("Invalid --date '{raw}'"))?,
        None => last.date,
    };

    let fit = regression::fit(&history, asset.origin_date).with_context(|| {
        format!(
            "Need at least {MIN_REGRESSION_POINTS} positive prices after {} to fit {}",
            asset.origin_date.format("%Y-%m-%d"),
            asset.asset_id
        )
    })?;
    let point = ctx
        .aggregator
        .calculate_with_regression(asset, &fit, price, date, &inputs);

    info!(
        asset = %asset.asset_id,
        risk_level = point.risk_level,
        factors = point.available_factor_count(),
        r_squared = fit.r_squared,
        "Scored asset"
    );

    let confidence = if args.dry_run {
        None
    } else {
        ctx.history_store()
            .upsert(&asset.asset_id, point.to_history_point())?;

        let tracker = ctx.tracker().await;
        let outcome = tracker
            .record_calculation(CalculationInput::from_point(&asset.asset_id, &fit, &point))
            .await?;
        debug!(
            snapshot = outcome.snapshot_recorded,
            resolved = outcome.predictions_resolved,
            "Recorded calculation"
        );
        tracker.flush().await?;

        Some(tracker.compute_confidence(&asset.asset_id).await?)
    };

    let report = ScoreReport {
        asset: &asset.asset_id,
        category: point.category().label(),
        point: &point,
        r_squared: fit.r_squared,
        regression_points: fit.data_points,
        confidence,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
