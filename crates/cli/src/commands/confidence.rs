//! Confidence CLI command.

use anyhow::Result;
use clap::Args;
use risk_engine_signals::ConfidenceBreakdown;

use crate::context::EngineContext;

/// Arguments for the confidence command.
#[derive(Args, Debug, Clone)]
pub struct ConfidenceArgs {
    /// Asset symbol or CoinGecko id (default: every registered asset)
    #[arg(long)]
    pub asset: Option<String>,

    /// Print breakdowns as JSON
    #[arg(long)]
    pub json: bool,
}

fn format_breakdown(b: &ConfidenceBreakdown) -> String {
    let accuracy = b
        .historical_accuracy
        .map_or_else(|| "n/a".to_string(), |a| format!("{:.1}%", a * 100.0));
    let r_squared = b
        .mean_recent_r_squared
        .map_or_else(|| "n/a".to_string(), |r| format!("{r:.3}"));

    format!(
        "{:<6} {:>2} -> {:>2} ({:+})  raw {:.2}  R² {} ({:+.1})  data {:+.1}  accuracy {} over {} ({:+.1})",
        b.asset_id,
        b.static_confidence,
        b.adaptive_confidence,
        b.adjustment(),
        b.raw_score,
        r_squared,
        b.r_squared_bonus,
        b.data_point_bonus,
        accuracy,
        b.graded_predictions,
        b.accuracy_bonus,
    )
}

/// Runs the confidence command.
///
/// # Errors
/// Returns an error if the asset is unknown or JSON serialization fails.
pub async fn run_confidence(args: &ConfidenceArgs, ctx: &EngineContext) -> Result<()> {
    let tracker = ctx.tracker().await;

    let asset_ids: Vec<String> = match &args.asset {
        Some(key) => vec![ctx.resolve(key)?.asset_id.clone()],
        None => ctx
            .registry
            .all()
            .iter()
            .map(|a| a.asset_id.clone())
            .collect(),
    };

    let mut breakdowns = Vec::with_capacity(asset_ids.len());
    for asset_id in &asset_ids {
        breakdowns.push(tracker.compute_confidence(asset_id).await?);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&breakdowns)?);
    } else {
        for breakdown in &breakdowns {
            println!("{}", format_breakdown(breakdown));
        }
    }
    Ok(())
}
