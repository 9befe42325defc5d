//! Multi-factor risk aggregation.
//!
//! Combines the log-regression deviation with whichever supplementary
//! indicators are available into one composite risk level in `[0, 1]`.

use chrono::{DateTime, Utc};
use risk_engine_core::{
    day_key, AssetRiskConfig, ConfigError, PricePoint, RiskHistoryPoint, ScoringConfig,
};
use serde::{Deserialize, Serialize};

use crate::factor::{RiskFactor, RiskFactorType, RiskFactorWeights};
use crate::normalizer::RiskFactorNormalizer;
use crate::regression::{self, log_deviation, normalize_deviation, RegressionResult};

/// Optional indicator readings for one scoring pass.
///
/// Each missing reading turns its factor unavailable rather than failing the pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplementaryIndicators {
    pub rsi: Option<f64>,
    pub sma_200: Option<f64>,
    pub funding_rate: Option<f64>,
    pub fear_greed: Option<f64>,
    pub vix: Option<f64>,
    pub dxy: Option<f64>,
    /// The two bull market support band values
    pub bull_market_bands: Option<(f64, f64)>,
    /// Recent VIX readings, oldest first, for context z-scores
    #[serde(default)]
    pub vix_history: Vec<f64>,
    /// Recent DXY readings, oldest first, for context z-scores
    #[serde(default)]
    pub dxy_history: Vec<f64>,
}

impl SupplementaryIndicators {
    #[must_use]
    pub fn with_rsi(mut self, rsi: f64) -> Self {
        self.rsi = Some(rsi);
        self
    }

    #[must_use]
    pub fn with_sma_200(mut self, sma: f64) -> Self {
        self.sma_200 = Some(sma);
        self
    }

    #[must_use]
    pub fn with_funding_rate(mut self, rate: f64) -> Self {
        self.funding_rate = Some(rate);
        self
    }

    #[must_use]
    pub fn with_fear_greed(mut self, index: f64) -> Self {
        self.fear_greed = Some(index);
        self
    }

    #[must_use]
    pub fn with_vix(mut self, vix: f64) -> Self {
        self.vix = Some(vix);
        self
    }

    #[must_use]
    pub fn with_dxy(mut self, dxy: f64) -> Self {
        self.dxy = Some(dxy);
        self
    }

    #[must_use]
    pub fn with_bull_market_bands(mut self, band_a: f64, band_b: f64) -> Self {
        self.bull_market_bands = Some((band_a, band_b));
        self
    }

    #[must_use]
    pub fn with_vix_history(mut self, history: Vec<f64>) -> Self {
        self.vix_history = history;
        self
    }

    #[must_use]
    pub fn with_dxy_history(mut self, history: Vec<f64>) -> Self {
        self.dxy_history = history;
        self
    }
}

/// Six-bucket reading of a composite risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    VeryLow,
    Low,
    Neutral,
    Elevated,
    High,
    Extreme,
}

impl RiskCategory {
    #[must_use]
    pub fn from_level(level: f64) -> Self {
        if level < 0.20 {
            Self::VeryLow
        } else if level < 0.40 {
            Self::Low
        } else if level < 0.55 {
            Self::Neutral
        } else if level < 0.70 {
            Self::Elevated
        } else if level < 0.90 {
            Self::High
        } else {
            Self::Extreme
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Neutral => "Neutral",
            Self::Elevated => "Elevated",
            Self::High => "High",
            Self::Extreme => "Extreme",
        }
    }
}

/// Composite risk for one asset at one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiFactorRiskPoint {
    pub date: DateTime<Utc>,
    /// Composite risk in `[0, 1]`
    pub risk_level: f64,
    pub price: f64,
    pub fair_value: f64,
    /// Signed log10 deviation of price from fair value
    pub deviation: f64,
    /// One entry per factor type, in [`RiskFactorType::ALL`] order
    pub factors: Vec<RiskFactor>,
}

impl MultiFactorRiskPoint {
    #[must_use]
    pub fn available_factor_count(&self) -> usize {
        self.factors.iter().filter(|f| f.is_available()).count()
    }

    /// Sum of the weights of available factors; 1.0 after renormalization.
    #[must_use]
    pub fn available_weight_total(&self) -> f64 {
        self.factors
            .iter()
            .filter(|f| f.is_available())
            .map(|f| f.weight)
            .sum()
    }

    #[must_use]
    pub fn factor(&self, factor_type: RiskFactorType) -> Option<&RiskFactor> {
        self.factors.iter().find(|f| f.factor_type == factor_type)
    }

    #[must_use]
    pub fn category(&self) -> RiskCategory {
        RiskCategory::from_level(self.risk_level)
    }

    /// Day-granular projection for charts and persisted history.
    #[must_use]
    pub fn to_history_point(&self) -> RiskHistoryPoint {
        RiskHistoryPoint::new(
            self.date,
            self.risk_level,
            self.price,
            self.fair_value,
            self.deviation,
        )
    }
}

/// Builds [`MultiFactorRiskPoint`]s from prices and indicators.
#[derive(Debug, Clone)]
pub struct MultiFactorRiskAggregator {
    weights: RiskFactorWeights,
    zscore_window: usize,
}

impl Default for MultiFactorRiskAggregator {
    fn default() -> Self {
        Self::new(RiskFactorWeights::default())
    }
}

impl MultiFactorRiskAggregator {
    #[must_use]
    pub fn new(weights: RiskFactorWeights) -> Self {
        Self {
            weights,
            zscore_window: risk_engine_core::statistics::DEFAULT_ZSCORE_WINDOW,
        }
    }

    /// Builds an aggregator from scoring configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for an unknown preset or invalid custom weights.
    pub fn from_config(config: &ScoringConfig) -> Result<Self, ConfigError> {
        let weights = match &config.custom_weights {
            Some(map) => RiskFactorWeights::from_map(map)?,
            None => RiskFactorWeights::preset(&config.weights_preset)?,
        };
        Ok(Self {
            weights,
            zscore_window: config.zscore_window,
        })
    }

    #[must_use]
    pub fn weights(&self) -> &RiskFactorWeights {
        &self.weights
    }

    /// Fits the asset's regression over `history` and scores `price` at `date`.
    ///
    /// Returns `None` when the history is too short to fit.
    #[must_use]
    pub fn calculate(
        &self,
        asset: &AssetRiskConfig,
        history: &[PricePoint],
        price: f64,
        date: DateTime<Utc>,
        inputs: &SupplementaryIndicators,
    ) -> Option<MultiFactorRiskPoint> {
        let fit = regression::fit(history, asset.origin_date)?;
        Some(self.calculate_with_regression(asset, &fit, price, date, inputs))
    }

    /// Scores `price` at `date` against an existing regression fit.
    ///
    /// With no factor available (a date at or before the asset's origin and
    /// no indicator readings) the risk level is 0.0. That is not a real score;
    /// callers should check [`MultiFactorRiskPoint::available_factor_count`].
    #[must_use]
    pub fn calculate_with_regression(
        &self,
        asset: &AssetRiskConfig,
        fit: &RegressionResult,
        price: f64,
        date: DateTime<Utc>,
        inputs: &SupplementaryIndicators,
    ) -> MultiFactorRiskPoint {
        let fair_value = fit.fair_value_at(&date);
        let deviation = log_deviation(price, fair_value);

        self.log_macro_context(asset, inputs);

        let factors: Vec<RiskFactor> = RiskFactorType::ALL
            .iter()
            .map(|&factor_type| {
                let weight = self.weights.weight(factor_type);
                let reading = match factor_type {
                    RiskFactorType::LogRegression => (fair_value > 0.0).then(|| {
                        (
                            deviation,
                            normalize_deviation(deviation, &asset.deviation_bounds),
                        )
                    }),
                    RiskFactorType::Rsi => inputs
                        .rsi
                        .map(|rsi| (rsi, RiskFactorNormalizer::normalize_rsi(rsi))),
                    RiskFactorType::Sma200 => inputs.sma_200.map(|sma| {
                        (sma, RiskFactorNormalizer::normalize_sma_position(price, sma))
                    }),
                    RiskFactorType::BullMarketBands => inputs.bull_market_bands.map(|(a, b)| {
                        (
                            (a + b) / 2.0,
                            RiskFactorNormalizer::normalize_bull_market_bands(price, a, b),
                        )
                    }),
                    RiskFactorType::FundingRate => inputs.funding_rate.map(|rate| {
                        (rate, RiskFactorNormalizer::normalize_funding_rate(rate))
                    }),
                    RiskFactorType::FearGreed => inputs.fear_greed.map(|index| {
                        (index, RiskFactorNormalizer::normalize_fear_greed(index))
                    }),
                    RiskFactorType::MacroRisk => {
                        RiskFactorNormalizer::normalize_macro(inputs.vix, inputs.dxy)
                            .map(|normalized| (normalized, normalized))
                    }
                };

                match reading {
                    Some((raw, normalized)) => {
                        RiskFactor::available(factor_type, raw, normalized, weight)
                    }
                    None => {
                        tracing::debug!(
                            asset = %asset.asset_id,
                            factor = factor_type.key(),
                            "Factor unavailable"
                        );
                        RiskFactor::unavailable(factor_type, weight)
                    }
                }
            })
            .collect();

        let factors = RiskFactorNormalizer::renormalize_weights(&factors);
        let risk_level = factors
            .iter()
            .filter_map(RiskFactor::weighted_contribution)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        let point = MultiFactorRiskPoint {
            date,
            risk_level,
            price,
            fair_value,
            deviation,
            factors,
        };

        if point.available_factor_count() == 0 {
            tracing::warn!(
                asset = %asset.asset_id,
                date = %day_key(&date),
                "No risk factor available, risk level is not meaningful"
            );
        }

        tracing::debug!(
            asset = %asset.asset_id,
            risk_level = point.risk_level,
            category = point.category().label(),
            available = point.available_factor_count(),
            "Computed multi-factor risk"
        );

        point
    }

    /// Regression-only risk for every UTC day in `history`, oldest first.
    ///
    /// Uses one fit over the whole history. When a day has several prices the
    /// latest one wins. Returns an empty series when the history cannot be fitted.
    #[must_use]
    pub fn calculate_history(
        &self,
        asset: &AssetRiskConfig,
        history: &[PricePoint],
    ) -> Vec<RiskHistoryPoint> {
        let Some(fit) = regression::fit(history, asset.origin_date) else {
            return Vec::new();
        };

        let mut sorted: Vec<&PricePoint> = history.iter().collect();
        sorted.sort_by_key(|p| p.date);

        let mut series: Vec<RiskHistoryPoint> = Vec::new();
        for point in sorted {
            let fair_value = fit.fair_value_at(&point.date);
            if fair_value <= 0.0 || point.price <= 0.0 {
                continue;
            }
            let deviation = log_deviation(point.price, fair_value);
            let risk_level = normalize_deviation(deviation, &asset.deviation_bounds);
            let entry =
                RiskHistoryPoint::new(point.date, risk_level, point.price, fair_value, deviation);

            match series.last_mut() {
                Some(last) if last.date_string == day_key(&point.date) => *last = entry,
                _ => series.push(entry),
            }
        }
        series
    }

    fn log_macro_context(&self, asset: &AssetRiskConfig, inputs: &SupplementaryIndicators) {
        let contexts = [
            (
                "vix",
                inputs.vix.and_then(|v| {
                    RiskFactorNormalizer::vix_context(v, &inputs.vix_history, self.zscore_window)
                }),
            ),
            (
                "dxy",
                inputs.dxy.and_then(|d| {
                    RiskFactorNormalizer::dxy_context(d, &inputs.dxy_history, self.zscore_window)
                }),
            ),
        ];

        for (name, context) in contexts {
            if let Some(z) = context.filter(|z| z.is_significant()) {
                tracing::info!(
                    asset = %asset.asset_id,
                    indicator = name,
                    zscore = %z.formatted(),
                    reading = z.description(),
                    "Macro indicator far from its recent range"
                );
            }
        }
    }
}
