//! Maps heterogeneous indicators onto a common `[0, 1]` risk scale.
//!
//! 1.0 always means the highest implied risk. Every output is clamped, and a
//! NaN input maps to the neutral 0.5 so nothing downstream sees NaN.

use risk_engine_core::statistics::{rolling_zscore, ZScoreResult};

use crate::factor::RiskFactor;

/// Clamps to `[0, 1]`, mapping NaN to neutral.
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub struct RiskFactorNormalizer;

impl RiskFactorNormalizer {
    /// 30 -> 0.0, 50 -> 0.5, 70 -> 1.0.
    #[must_use]
    pub fn normalize_rsi(rsi: f64) -> f64 {
        unit((rsi - 30.0) / 40.0)
    }

    /// Stepwise position of price relative to its 200-day SMA.
    ///
    /// With `p` the percentage distance of price above the SMA:
    ///
    /// | p | value |
    /// |---|---|
    /// | p > 20 | 0.1 |
    /// | 10 < p <= 20 | 0.2 |
    /// | 5 < p <= 10 | 0.3 |
    /// | -5 <= p <= 5 | 0.5 - p/50 (0.6 down to 0.4) |
    /// | -10 <= p < -5 | 0.7 |
    /// | -20 <= p < -10 | 0.8 |
    /// | p < -20 | 0.9 |
    ///
    /// A value exactly on a threshold falls in the bucket nearer the centre.
    /// A non-positive SMA yields 0.5.
    #[must_use]
    pub fn normalize_sma_position(price: f64, sma: f64) -> f64 {
        if !(sma > 0.0) || price.is_nan() {
            return 0.5;
        }
        let p = (price - sma) * 100.0 / sma;
        if p.is_nan() {
            return 0.5;
        }

        let value = if p > 20.0 {
            0.1
        } else if p > 10.0 {
            0.2
        } else if p > 5.0 {
            0.3
        } else if p >= -5.0 {
            0.5 - p / 50.0
        } else if p >= -10.0 {
            0.7
        } else if p >= -20.0 {
            0.8
        } else {
            0.9
        };
        unit(value)
    }

    /// Rate 0 -> 0.5; -0.1% -> 0.0; +0.1% -> 1.0.
    #[must_use]
    pub fn normalize_funding_rate(rate: f64) -> f64 {
        unit((rate + 0.001) / 0.002)
    }

    /// Index / 100.
    #[must_use]
    pub fn normalize_fear_greed(index: f64) -> f64 {
        unit(index / 100.0)
    }

    /// Low VIX reads as complacency and scores higher. Always in `[0.3, 0.7]`.
    #[must_use]
    pub fn normalize_vix(vix: f64) -> f64 {
        let complacency = if vix.is_nan() {
            0.5
        } else {
            ((40.0 - vix) / 30.0).clamp(0.0, 1.0)
        };
        0.3 + 0.4 * complacency
    }

    /// 90 -> 0.0, 100 -> 0.5, 110 -> 1.0.
    #[must_use]
    pub fn normalize_dxy(dxy: f64) -> f64 {
        unit((dxy - 90.0) / 20.0)
    }

    /// Mean of whichever of the VIX and DXY readings are present.
    #[must_use]
    pub fn normalize_macro(vix: Option<f64>, dxy: Option<f64>) -> Option<f64> {
        match (vix.map(Self::normalize_vix), dxy.map(Self::normalize_dxy)) {
            (Some(v), Some(d)) => Some((v + d) / 2.0),
            (Some(v), None) => Some(v),
            (None, Some(d)) => Some(d),
            (None, None) => None,
        }
    }

    /// Stepwise distance of price from the bull market support bands.
    ///
    /// Inside the bands scores 0.5. Outside, each started 10% of distance
    /// from the bands' average moves 0.1 toward 0.1 (above) or 0.9 (below),
    /// so exactly 10% away is still the first step.
    #[must_use]
    pub fn normalize_bull_market_bands(price: f64, band_a: f64, band_b: f64) -> f64 {
        let average = (band_a + band_b) / 2.0;
        if !(average > 0.0) || price.is_nan() {
            return 0.5;
        }
        let lower = band_a.min(band_b);
        let upper = band_a.max(band_b);
        if (lower..=upper).contains(&price) {
            return 0.5;
        }

        let pct = ((price - average) * 100.0 / average).abs();
        let steps = (pct / 10.0).ceil().clamp(1.0, 4.0);
        if price > upper {
            unit(0.5 - 0.1 * steps)
        } else {
            unit(0.5 + 0.1 * steps)
        }
    }

    /// Rescales weights so available factors sum to one.
    ///
    /// Unavailable factors keep their declared weight and are left out of the
    /// denominator. If nothing is available, or the available weights sum to
    /// zero, the factors are returned unchanged.
    #[must_use]
    pub fn renormalize_weights(factors: &[RiskFactor]) -> Vec<RiskFactor> {
        let available_total: f64 = factors
            .iter()
            .filter(|f| f.is_available())
            .map(|f| f.weight)
            .sum();

        if !(available_total > 0.0) {
            return factors.to_vec();
        }

        factors
            .iter()
            .map(|f| {
                let mut factor = f.clone();
                if factor.is_available() {
                    factor.weight /= available_total;
                }
                factor
            })
            .collect()
    }

    /// Rolling z-score of today's VIX against its recent history.
    #[must_use]
    pub fn vix_context(vix: f64, history: &[f64], window: usize) -> Option<ZScoreResult> {
        rolling_zscore(vix, history, window)
    }

    /// Rolling z-score of today's DXY against its recent history.
    #[must_use]
    pub fn dxy_context(dxy: f64, history: &[f64], window: usize) -> Option<ZScoreResult> {
        rolling_zscore(dxy, history, window)
    }
}
