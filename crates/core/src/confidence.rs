//! Persisted per-asset confidence state.
//!
//! These records are owned and mutated by the confidence tracker in the
//! signals crate; this module only defines their shape so that stores can
//! persist them without depending on the tracker.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::history::utc_day;
use crate::statistics;

/// One regression fit quality observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RSquaredEntry {
    pub date: DateTime<Utc>,
    pub r_squared: f64,
}

/// A directional risk call waiting to be graded against a later price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSnapshot {
    pub date: DateTime<Utc>,
    pub risk_level: f64,
    pub price: f64,
    /// Price used to grade the call, once graded
    #[serde(default)]
    pub outcome_price: Option<f64>,
    #[serde(default)]
    pub outcome_date: Option<DateTime<Utc>>,
    /// `Some(true)` if the call was confirmed by the outcome
    #[serde(default)]
    pub was_correct: Option<bool>,
}

impl PredictionSnapshot {
    #[must_use]
    pub fn new(date: DateTime<Utc>, risk_level: f64, price: f64) -> Self {
        Self {
            date,
            risk_level,
            price,
            outcome_price: None,
            outcome_date: None,
            was_correct: None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.was_correct.is_some()
    }

    /// UTC calendar day the snapshot was taken on.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        utc_day(&self.date)
    }
}

/// Rolling record of how trustworthy an asset's risk score has been.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    pub asset_id: String,
    /// One entry per calculation, oldest first
    #[serde(default)]
    pub r_squared_history: Vec<RSquaredEntry>,
    /// At most one per UTC day, oldest first
    #[serde(default)]
    pub prediction_snapshots: Vec<PredictionSnapshot>,
    /// Data points behind the most recent calculation
    #[serde(default)]
    pub data_point_count: usize,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ConfidenceMetrics {
    #[must_use]
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            ..Self::default()
        }
    }

    /// True if a snapshot already exists for `date`'s UTC day.
    #[must_use]
    pub fn has_snapshot_on(&self, date: &DateTime<Utc>) -> bool {
        let day = utc_day(date);
        self.prediction_snapshots.iter().any(|s| s.day() == day)
    }

    /// Snapshots that have been graded.
    pub fn resolved_snapshots(&self) -> impl Iterator<Item = &PredictionSnapshot> {
        self.prediction_snapshots.iter().filter(|s| s.is_resolved())
    }

    /// Fraction of graded snapshots that were correct, if any were graded.
    #[must_use]
    pub fn historical_accuracy(&self) -> Option<f64> {
        let (graded, correct) = self
            .resolved_snapshots()
            .fold((0usize, 0usize), |(graded, correct), s| {
                (graded + 1, correct + usize::from(s.was_correct == Some(true)))
            });
        if graded == 0 {
            None
        } else {
            Some(correct as f64 / graded as f64)
        }
    }

    /// Mean of the last `window` R² values, if any exist.
    #[must_use]
    pub fn mean_recent_r_squared(&self, window: usize) -> Option<f64> {
        if self.r_squared_history.is_empty() || window == 0 {
            return None;
        }
        let start = self.r_squared_history.len().saturating_sub(window);
        let recent: Vec<f64> = self.r_squared_history[start..]
            .iter()
            .map(|e| e.r_squared)
            .collect();
        Some(statistics::mean(&recent))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.r_squared_history.is_empty() && self.prediction_snapshots.is_empty()
    }
}
