use serde::{Deserialize, Serialize};

use crate::asset::AssetRiskConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub confidence: ConfidenceConfig,
    pub storage: StorageConfig,
    /// Assets added on top of the built-in set
    pub assets: Vec<AssetRiskConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// `default`, `conservative` or `sentiment_focused`
    pub weights_preset: String,
    /// Overrides the preset when present. Keys are factor names.
    pub custom_weights: Option<std::collections::BTreeMap<String, f64>>,
    /// Rolling window for VIX/DXY context z-scores
    pub zscore_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub neutral_band_low: f64,
    pub neutral_band_high: f64,
    /// Age in days at which a prediction snapshot gets graded
    pub outcome_horizon_days: i64,
    /// Number of recent R² entries averaged for the quality bonus
    pub rsquared_window: usize,
    /// Oldest R² entries are dropped beyond this
    pub max_rsquared_history: usize,
    pub flush_interval_secs: u64,
    pub flush_on_mutation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights_preset: "default".to_string(),
            custom_weights: None,
            zscore_window: crate::statistics::DEFAULT_ZSCORE_WINDOW,
        }
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            neutral_band_low: 0.45,
            neutral_band_high: 0.55,
            outcome_horizon_days: 30,
            rsquared_window: 30,
            max_rsquared_history: 1000,
            flush_interval_secs: 60,
            flush_on_mutation: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}
