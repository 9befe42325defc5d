//! Risk factor model and weight presets.

use risk_engine_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance used when checking that weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 0.001;

/// The seven indicators that feed the composite risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorType {
    LogRegression,
    Rsi,
    Sma200,
    BullMarketBands,
    FundingRate,
    FearGreed,
    MacroRisk,
}

impl RiskFactorType {
    /// All variants in display order.
    pub const ALL: [Self; 7] = [
        Self::LogRegression,
        Self::Rsi,
        Self::Sma200,
        Self::BullMarketBands,
        Self::FundingRate,
        Self::FearGreed,
        Self::MacroRisk,
    ];

    /// Weight used by the default preset. The seven defaults sum to 1.0.
    #[must_use]
    pub const fn default_weight(self) -> f64 {
        match self {
            Self::LogRegression => 0.30,
            Self::Rsi => 0.15,
            Self::Sma200 => 0.15,
            Self::BullMarketBands => 0.10,
            Self::FundingRate => 0.10,
            Self::FearGreed => 0.10,
            Self::MacroRisk => 0.10,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LogRegression => "Log Regression",
            Self::Rsi => "RSI",
            Self::Sma200 => "200-Day SMA",
            Self::BullMarketBands => "Bull Market Support Bands",
            Self::FundingRate => "Funding Rate",
            Self::FearGreed => "Fear & Greed Index",
            Self::MacroRisk => "Macro Risk",
        }
    }

    /// Snake-case key used in configuration files.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::LogRegression => "log_regression",
            Self::Rsi => "rsi",
            Self::Sma200 => "sma200",
            Self::BullMarketBands => "bull_market_bands",
            Self::FundingRate => "funding_rate",
            Self::FearGreed => "fear_greed",
            Self::MacroRisk => "macro_risk",
        }
    }

    /// One-line explanation of what drives the factor.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::LogRegression => "Deviation of price from its long-term power-law fair value",
            Self::Rsi => "Momentum from the 14-period relative strength index",
            Self::Sma200 => "Position of price relative to its 200-day moving average",
            Self::BullMarketBands => "Distance of price from the bull market support bands",
            Self::FundingRate => "Perpetual futures funding rate (leverage demand)",
            Self::FearGreed => "Market sentiment from the fear & greed index",
            Self::MacroRisk => "Macro backdrop from volatility (VIX) and dollar strength (DXY)",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key().eq_ignore_ascii_case(key))
    }
}

/// One factor's contribution to a risk point.
///
/// A factor is unavailable when both values are absent; its weight is still
/// carried so callers can see what share it would have had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor_type: RiskFactorType,
    pub raw_value: Option<f64>,
    pub normalized_value: Option<f64>,
    pub weight: f64,
}

impl RiskFactor {
    #[must_use]
    pub fn available(factor_type: RiskFactorType, raw: f64, normalized: f64, weight: f64) -> Self {
        Self {
            factor_type,
            raw_value: Some(raw),
            normalized_value: Some(normalized),
            weight,
        }
    }

    #[must_use]
    pub fn unavailable(factor_type: RiskFactorType, weight: f64) -> Self {
        Self {
            factor_type,
            raw_value: None,
            normalized_value: None,
            weight,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.normalized_value.is_some()
    }

    /// `normalized * weight`, when available.
    #[must_use]
    pub fn weighted_contribution(&self) -> Option<f64> {
        self.normalized_value.map(|v| v * self.weight)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.factor_type.label()
    }
}

/// One weight per factor type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskFactorWeights {
    pub log_regression: f64,
    pub rsi: f64,
    pub sma200: f64,
    pub bull_market_bands: f64,
    pub funding_rate: f64,
    pub fear_greed: f64,
    pub macro_risk: f64,
}

impl Default for RiskFactorWeights {
    fn default() -> Self {
        Self {
            log_regression: RiskFactorType::LogRegression.default_weight(),
            rsi: RiskFactorType::Rsi.default_weight(),
            sma200: RiskFactorType::Sma200.default_weight(),
            bull_market_bands: RiskFactorType::BullMarketBands.default_weight(),
            funding_rate: RiskFactorType::FundingRate.default_weight(),
            fear_greed: RiskFactorType::FearGreed.default_weight(),
            macro_risk: RiskFactorType::MacroRisk.default_weight(),
        }
    }
}

impl RiskFactorWeights {
    /// Leans on the slow structural factors.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            log_regression: 0.40,
            rsi: 0.10,
            sma200: 0.20,
            bull_market_bands: 0.15,
            funding_rate: 0.05,
            fear_greed: 0.05,
            macro_risk: 0.05,
        }
    }

    /// Leans on positioning and sentiment.
    #[must_use]
    pub fn sentiment_focused() -> Self {
        Self {
            log_regression: 0.20,
            rsi: 0.15,
            sma200: 0.10,
            bull_market_bands: 0.05,
            funding_rate: 0.15,
            fear_greed: 0.25,
            macro_risk: 0.10,
        }
    }

    /// Looks up a named preset.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownPreset`] for unrecognised names.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "default" => Ok(Self::default()),
            "conservative" => Ok(Self::conservative()),
            "sentiment_focused" | "sentiment" => Ok(Self::sentiment_focused()),
            _ => Err(ConfigError::UnknownPreset(name.to_string())),
        }
    }

    /// Builds weights from a `factor key -> weight` map. Missing keys are zero.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for unknown keys or weights that are not valid.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        let mut weights = Self {
            log_regression: 0.0,
            rsi: 0.0,
            sma200: 0.0,
            bull_market_bands: 0.0,
            funding_rate: 0.0,
            fear_greed: 0.0,
            macro_risk: 0.0,
        };
        for (key, value) in map {
            let factor_type = RiskFactorType::from_key(key)
                .ok_or_else(|| ConfigError::UnknownFactor(key.clone()))?;
            weights.set(factor_type, *value);
        }
        weights.validate()?;
        Ok(weights)
    }

    #[must_use]
    pub fn weight(&self, factor_type: RiskFactorType) -> f64 {
        match factor_type {
            RiskFactorType::LogRegression => self.log_regression,
            RiskFactorType::Rsi => self.rsi,
            RiskFactorType::Sma200 => self.sma200,
            RiskFactorType::BullMarketBands => self.bull_market_bands,
            RiskFactorType::FundingRate => self.funding_rate,
            RiskFactorType::FearGreed => self.fear_greed,
            RiskFactorType::MacroRisk => self.macro_risk,
        }
    }

    fn set(&mut self, factor_type: RiskFactorType, value: f64) {
        let slot = match factor_type {
            RiskFactorType::LogRegression => &mut self.log_regression,
            RiskFactorType::Rsi => &mut self.rsi,
            RiskFactorType::Sma200 => &mut self.sma200,
            RiskFactorType::BullMarketBands => &mut self.bull_market_bands,
            RiskFactorType::FundingRate => &mut self.funding_rate,
            RiskFactorType::FearGreed => &mut self.fear_greed,
            RiskFactorType::MacroRisk => &mut self.macro_risk,
        };
        *slot = value;
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        RiskFactorType::ALL.iter().map(|t| self.weight(*t)).sum()
    }

    /// True if every weight is non-negative and the seven sum to 1.0.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        RiskFactorType::ALL
            .iter()
            .all(|t| self.weight(*t) >= 0.0 && self.weight(*t).is_finite())
            && (self.total() - 1.0).abs() <= WEIGHT_TOLERANCE
    }

    /// # Errors
    /// Returns [`ConfigError::InvalidWeights`] if [`Self::is_valid`] is false.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ConfigError::InvalidWeights { sum: self.total() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let sum: f64 = RiskFactorType::ALL.iter().map(|t| t.default_weight()).sum();
        assert!((sum - 1.0).abs() < WEIGHT_TOLERANCE);
    }

    #[test]
    fn every_preset_is_valid() {
        for weights in [
            RiskFactorWeights::default(),
            RiskFactorWeights::conservative(),
            RiskFactorWeights::sentiment_focused(),
        ] {
            assert!(weights.is_valid(), "{weights:?}");
            assert!((weights.total() - 1.0).abs() < WEIGHT_TOLERANCE);
        }
    }

    #[test]
    fn preset_lookup_by_name() {
        assert_eq!(
            RiskFactorWeights::preset("Conservative").unwrap(),
            RiskFactorWeights::conservative()
        );
        assert_eq!(
            RiskFactorWeights::preset("sentiment-focused").unwrap(),
            RiskFactorWeights::sentiment_focused()
        );
        assert!(matches!(
            RiskFactorWeights::preset("aggressive"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn invalid_weights_detected() {
        let mut weights = RiskFactorWeights::default();
        weights.rsi += 0.1;
        assert!(!weights.is_valid());
        assert!(weights.validate().is_err());

        let mut negative = RiskFactorWeights::default();
        negative.rsi = -0.05;
        negative.log_regression += 0.20;
        assert!(!negative.is_valid());
    }

    #[test]
    fn weights_from_map() {
        let map: BTreeMap<String, f64> = [
            ("log_regression".to_string(), 0.5),
            ("rsi".to_string(), 0.25),
            ("fear_greed".to_string(), 0.25),
        ]
        .into_iter()
        .collect();

        let weights = RiskFactorWeights::from_map(&map).unwrap();
        assert!((weights.log_regression - 0.5).abs() < f64::EPSILON);
        assert!(weights.sma200.abs() < f64::EPSILON);

        let mut bad = map.clone();
        bad.insert("momentum".to_string(), 0.0);
        assert!(RiskFactorWeights::from_map(&bad).is_err());
    }

    #[test]
    fn weights_survive_json() {
        let weights = RiskFactorWeights::sentiment_focused();
        let json = serde_json::to_string(&weights).unwrap();
        let decoded: RiskFactorWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, weights);
    }

    #[test]
    fn unavailable_factor_has_no_contribution() {
        let factor = RiskFactor::unavailable(RiskFactorType::FundingRate, 0.1);
        assert!(!factor.is_available());
        assert!(factor.weighted_contribution().is_none());
        assert_eq!(factor.label(), "Funding Rate");

        let factor = RiskFactor::available(RiskFactorType::Rsi, 70.0, 1.0, 0.15);
        assert!((factor.weighted_contribution().unwrap() - 0.15).abs() < f64::EPSILON);
    }
}
