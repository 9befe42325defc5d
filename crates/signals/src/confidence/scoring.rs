use risk_engine_core::{AssetRiskConfig, ConfidenceMetrics};
use serde::{Deserialize, Serialize};

/// Relative price move a directional call needs to be graded correct.
pub const OUTCOME_MOVE_THRESHOLD: f64 = 0.05;

/// Mean R² at which the quality bonus is zero.
pub const R_SQUARED_PIVOT: f64 = 0.85;

/// History length (daily points) below which no data bonus is given.
pub const DATA_POINT_BASELINE: f64 = 365.0;

pub const MIN_CONFIDENCE: u8 = 1;
pub const MAX_CONFIDENCE: u8 = 9;

/// Risk levels inside `[low, high]` carry no directional call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeutralBand {
    pub low: f64,
    pub high: f64,
}

impl Default for NeutralBand {
    fn default() -> Self {
        Self {
            low: 0.45,
            high: 0.55,
        }
    }
}

impl NeutralBand {
    #[must_use]
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// True if a snapshot should be recorded for this risk level.
    #[must_use]
    pub fn is_directional(&self, risk_level: f64) -> bool {
        risk_level > self.high || risk_level < self.low
    }

    /// Grades a call made at `snapshot_price` against `outcome_price`.
    ///
    /// High risk (`>= high`) expects a drop of at least 5%, low risk (`< low`)
    /// a rise of at least 5%. Neutral calls are never correct.
    #[must_use]
    pub fn evaluate(&self, risk_level: f64, snapshot_price: f64, outcome_price: f64) -> bool {
        if risk_level >= self.high {
            outcome_price <= snapshot_price * (1.0 - OUTCOME_MOVE_THRESHOLD)
        } else if risk_level < self.low {
            outcome_price >= snapshot_price * (1.0 + OUTCOME_MOVE_THRESHOLD)
        } else {
            false
        }
    }
}

/// Grades a prediction using the default 0.45..0.55 neutral band.
#[must_use]
pub fn evaluate_prediction(risk_level: f64, snapshot_price: f64, outcome_price: f64) -> bool {
    NeutralBand::default().evaluate(risk_level, snapshot_price, outcome_price)
}

/// `clamp((mean - 0.85) * 5, -0.5, 1.0)`; zero without history.
#[must_use]
pub fn r_squared_bonus(mean_recent: Option<f64>) -> f64 {
    match mean_recent {
        Some(mean) if mean.is_finite() => ((mean - R_SQUARED_PIVOT) * 5.0).clamp(-0.5, 1.0),
        _ => 0.0,
    }
}

/// Zero up to a year of data, then `log2(count / 365) / 4` capped at 1.
#[must_use]
pub fn data_point_bonus(count: usize) -> f64 {
    let count = count as f64;
    if count <= DATA_POINT_BASELINE {
        return 0.0;
    }
    ((count / DATA_POINT_BASELINE).log2() / 4.0).clamp(0.0, 1.0)
}

/// `clamp((accuracy - 0.5) * 2, -1, 1)`; zero with nothing graded.
#[must_use]
pub fn accuracy_bonus(accuracy: Option<f64>) -> f64 {
    match accuracy {
        Some(acc) if acc.is_finite() => ((acc - 0.5) * 2.0).clamp(-1.0, 1.0),
        _ => 0.0,
    }
}

/// Rounds `raw` and keeps it within one step of `baseline` and inside `[1, 9]`.
#[must_use]
pub fn bounded_confidence(baseline: u8, raw: f64) -> u8 {
    let baseline = baseline.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
    if raw.is_nan() {
        return baseline;
    }
    let floor = baseline.saturating_sub(1).max(MIN_CONFIDENCE);
    let cap = baseline.saturating_add(1).min(MAX_CONFIDENCE);
    raw.round().clamp(f64::from(floor), f64::from(cap)) as u8
}

/// Static and adaptive confidence for one asset, with the terms behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub asset_id: String,
    pub static_confidence: u8,
    pub adaptive_confidence: u8,
    pub r_squared_bonus: f64,
    pub data_point_bonus: f64,
    pub accuracy_bonus: f64,
    /// Baseline plus bonuses, before rounding and bounding
    pub raw_score: f64,
    pub graded_predictions: usize,
    pub historical_accuracy: Option<f64>,
    pub mean_recent_r_squared: Option<f64>,
}

impl ConfidenceBreakdown {
    #[must_use]
    pub fn compute(
        asset: &AssetRiskConfig,
        metrics: &ConfidenceMetrics,
        rsquared_window: usize,
    ) -> Self {
        let mean_recent_r_squared = metrics.mean_recent_r_squared(rsquared_window);
        let historical_accuracy = metrics.historical_accuracy();

        let r_squared_bonus = r_squared_bonus(mean_recent_r_squared);
        let data_point_bonus = data_point_bonus(metrics.data_point_count);
        let accuracy_bonus = accuracy_bonus(historical_accuracy);

        let raw_score =
            f64::from(asset.confidence_level) + r_squared_bonus + data_point_bonus + accuracy_bonus;

        Self {
            asset_id: asset.asset_id.clone(),
            static_confidence: asset.confidence_level,
            adaptive_confidence: bounded_confidence(asset.confidence_level, raw_score),
            r_squared_bonus,
            data_point_bonus,
            accuracy_bonus,
            raw_score,
            graded_predictions: metrics.resolved_snapshots().count(),
            historical_accuracy,
            mean_recent_r_squared,
        }
    }

    /// Adaptive minus static confidence: -1, 0 or +1.
    #[must_use]
    pub fn adjustment(&self) -> i8 {
        self.adaptive_confidence as i8 - self.static_confidence as i8
    }
}
