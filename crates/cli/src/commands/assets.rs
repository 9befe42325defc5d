//! Assets CLI command.
//!
//! Lists the built-in and configured assets with their regression origin,
//! deviation bounds and baseline confidence.

use anyhow::Result;
use clap::Args;
use risk_engine_core::AssetRiskConfig;

use crate::context::EngineContext;

/// Arguments for the assets command.
#[derive(Args, Debug, Clone)]
pub struct AssetsArgs {
    /// Print the registry as JSON
    #[arg(long)]
    pub json: bool,
}

fn format_row(asset: &AssetRiskConfig) -> String {
    format!(
        "{:<6} {:<12} {:<14} {:<10} {:>11} {:>5}",
        asset.asset_id,
        asset.display_name,
        asset.gecko_id,
        asset.origin_date.format("%Y-%m-%d").to_string(),
        format!("±{:.2}", asset.deviation_bounds.high),
        asset.confidence_level,
    )
}

/// Runs the assets command.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn run_assets(args: &AssetsArgs, ctx: &EngineContext) -> Result<()> {
    let assets = ctx.registry.all();

    if args.json {
        println!("{}", serde_json::to_string_pretty(assets)?);
        return Ok(());
    }

    println!(
        "{:<6} {:<12} {:<14} {:<10} {:>11} {:>5}",
        "SYMBOL", "NAME", "GECKO ID", "ORIGIN", "BOUNDS", "CONF"
    );
    for asset in assets {
        println!("{}", format_row(asset));
    }
    println!("\n{} assets", assets.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_engine_core::builtin_assets;

    #[test]
    fn row_shows_bounds_and_baseline() {
        let btc = builtin_assets()
            .into_iter()
            .find(|a| a.asset_id == "BTC")
            .unwrap();
        let row = format_row(&btc);

        assert!(row.starts_with("BTC"));
        assert!(row.contains("bitcoin"));
        assert!(row.contains("2009-01-03"));
        assert!(row.contains("±0.80"));
        assert!(row.trim_end().ends_with('8'));
    }
}
