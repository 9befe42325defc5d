//! Static per-asset risk parameters.
//!
//! Each supported asset carries an origin date that anchors its logarithmic
//! regression, symmetric deviation bounds used to squash log-deviation into
//! `[0, 1]`, and a baseline confidence level in `[1, 9]`.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfigError;

/// Lower and upper log-deviation bounds. Must satisfy `|low| == high > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviationBounds {
    pub low: f64,
    pub high: f64,
}

impl DeviationBounds {
    /// Symmetric bounds `(-magnitude, magnitude)`.
    #[must_use]
    pub fn symmetric(magnitude: f64) -> Self {
        Self {
            low: -magnitude.abs(),
            high: magnitude.abs(),
        }
    }

    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.high > 0.0 && (self.low.abs() - self.high).abs() < 1e-12
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// Risk parameters for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRiskConfig {
    /// Ticker symbol, e.g. `BTC`
    pub asset_id: String,
    /// CoinGecko id, e.g. `bitcoin`
    pub gecko_id: String,
    /// Binance spot pair, e.g. `BTCUSDT`
    pub binance_symbol: String,
    pub display_name: String,
    /// Regression anchor; days are counted from here
    pub origin_date: DateTime<Utc>,
    pub deviation_bounds: DeviationBounds,
    /// Baseline confidence in `[1, 9]`
    pub confidence_level: u8,
}

impl AssetRiskConfig {
    /// Checks the per-asset invariants.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the bounds are asymmetric or zero, or the
    /// confidence level is outside `[1, 9]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.deviation_bounds.is_symmetric() {
            return Err(ConfigError::InvalidBounds {
                asset: self.asset_id.clone(),
                low: self.deviation_bounds.low,
                high: self.deviation_bounds.high,
            });
        }
        if !(1..=9).contains(&self.confidence_level) {
            return Err(ConfigError::InvalidConfidenceLevel {
                asset: self.asset_id.clone(),
                level: self.confidence_level,
            });
        }
        Ok(())
    }
}

fn origin(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_default()
}

fn builtin(
    asset_id: &str,
    gecko_id: &str,
    display_name: &str,
    origin_date: DateTime<Utc>,
    bound: f64,
    confidence_level: u8,
) -> AssetRiskConfig {
    AssetRiskConfig {
        asset_id: asset_id.to_string(),
        gecko_id: gecko_id.to_string(),
        binance_symbol: format!("{asset_id}USDT"),
        display_name: display_name.to_string(),
        origin_date,
        deviation_bounds: DeviationBounds::symmetric(bound),
        confidence_level,
    }
}

/// The assets supported out of the box.
#[must_use]
pub fn builtin_assets() -> Vec<AssetRiskConfig> {
    vec![
        builtin("BTC", "bitcoin", "Bitcoin", origin(2009, 1, 3), 0.8, 8),
        builtin("ETH", "ethereum", "Ethereum", origin(2015, 7, 30), 1.0, 7),
        builtin("SOL", "solana", "Solana", origin(2020, 3, 16), 1.2, 5),
        builtin("BNB", "binancecoin", "BNB", origin(2017, 7, 25), 1.0, 6),
        builtin("XRP", "ripple", "XRP", origin(2013, 8, 4), 1.0, 5),
        builtin("ADA", "cardano", "Cardano", origin(2017, 10, 1), 1.0, 5),
        builtin("DOGE", "dogecoin", "Dogecoin", origin(2013, 12, 15), 1.2, 4),
        builtin("LINK", "chainlink", "Chainlink", origin(2017, 9, 20), 1.1, 5),
        builtin("AVAX", "avalanche-2", "Avalanche", origin(2020, 9, 22), 1.2, 4),
    ]
}

/// Validated, immutable set of asset configurations.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    assets: Vec<AssetRiskConfig>,
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self {
            assets: builtin_assets(),
        }
    }
}

impl AssetRegistry {
    /// Builds a registry from an explicit list.
    ///
    /// Symbols, CoinGecko ids and Binance symbols share one key space, since
    /// [`AssetRegistry::resolve`] accepts any of them.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if any asset is invalid or any lookup key
    /// (case-insensitive) belongs to two assets.
    pub fn with_assets(assets: Vec<AssetRiskConfig>) -> Result<Self, ConfigError> {
        let mut owners: HashMap<String, usize> = HashMap::new();
        // True if `key` is unused or already belongs to asset `index`
        let mut claim = |key: &str, index: usize| {
            *owners.entry(key.to_ascii_lowercase()).or_insert(index) == index
        };

        for (index, asset) in assets.iter().enumerate() {
            asset.validate()?;
            if !claim(asset.asset_id.as_str(), index) {
                return Err(ConfigError::DuplicateSymbol(asset.asset_id.clone()));
            }
            if !claim(asset.gecko_id.as_str(), index) {
                return Err(ConfigError::DuplicateExternalId(asset.gecko_id.clone()));
            }
            if !claim(asset.binance_symbol.as_str(), index) {
                return Err(ConfigError::DuplicateExchangeSymbol(
                    asset.binance_symbol.clone(),
                ));
            }
        }

        Ok(Self { assets })
    }

    /// Built-in assets followed by `extra`, validated together.
    ///
    /// # Errors
    /// See [`AssetRegistry::with_assets`].
    pub fn extended(extra: Vec<AssetRiskConfig>) -> Result<Self, ConfigError> {
        let mut assets = builtin_assets();
        assets.extend(extra);
        Self::with_assets(assets)
    }

    /// Lookup by ticker symbol, case-insensitive.
    #[must_use]
    pub fn by_symbol(&self, symbol: &str) -> Option<&AssetRiskConfig> {
        self.assets
            .iter()
            .find(|a| a.asset_id.eq_ignore_ascii_case(symbol))
    }

    /// Lookup by CoinGecko id, case-insensitive.
    #[must_use]
    pub fn by_gecko_id(&self, gecko_id: &str) -> Option<&AssetRiskConfig> {
        self.assets
            .iter()
            .find(|a| a.gecko_id.eq_ignore_ascii_case(gecko_id))
    }

    /// Lookup by Binance pair symbol, case-insensitive.
    #[must_use]
    pub fn by_binance_symbol(&self, binance_symbol: &str) -> Option<&AssetRiskConfig> {
        self.assets
            .iter()
            .find(|a| a.binance_symbol.eq_ignore_ascii_case(binance_symbol))
    }

    /// Lookup by symbol, falling back to external id.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<&AssetRiskConfig> {
        self.by_symbol(key)
            .or_else(|| self.by_gecko_id(key))
            .or_else(|| self.by_binance_symbol(key))
    }

    #[must_use]
    pub fn all(&self) -> &[AssetRiskConfig] {
        &self.assets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
