//! Descriptive statistics used across the risk engine.
//!
//! Every function here is pure. Inputs that are too short to carry a signal
//! produce `0.0` for the plain aggregates and `None` for anything that would
//! otherwise divide by a zero spread.

use serde::{Deserialize, Serialize};

/// Minimum history length required before a z-score is considered meaningful.
pub const MIN_ZSCORE_HISTORY: usize = 20;

/// Window used by callers that do not pick their own rolling z-score window.
pub const DEFAULT_ZSCORE_WINDOW: usize = 90;

/// Arithmetic mean. Returns 0.0 for empty input.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
///
/// Returns 0.0 for fewer than two values.
#[must_use]
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Population standard deviation (n denominator).
///
/// Returns 0.0 for fewer than two values.
#[must_use]
pub fn population_standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// A value's position relative to a historical distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreResult {
    /// Mean of the history the value was compared against
    pub mean: f64,
    /// Sample standard deviation of that history
    pub standard_deviation: f64,
    /// Number of standard deviations the value sits from the mean
    pub z_score: f64,
}

impl ZScoreResult {
    /// |z| >= 2
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.z_score.abs() >= 2.0
    }

    /// |z| >= 3
    #[must_use]
    pub fn is_extreme(&self) -> bool {
        self.z_score.abs() >= 3.0
    }

    /// Qualitative description of where the value sits.
    #[must_use]
    pub fn description(&self) -> &'static str {
        let z = self.z_score;
        if z >= 3.0 {
            "Extremely High"
        } else if z >= 2.0 {
            "Significantly High"
        } else if z >= 1.0 {
            "Above Average"
        } else if z > -1.0 {
            "Normal Range"
        } else if z > -2.0 {
            "Below Average"
        } else if z > -3.0 {
            "Significantly Low"
        } else {
            "Extremely Low"
        }
    }

    /// Signed one-decimal sigma string, e.g. `+1.5σ`.
    #[must_use]
    pub fn formatted(&self) -> String {
        format!("{:+.1}σ", self.z_score)
    }
}

/// Z-score of `current` against `history`.
///
/// Returns `None` when the history holds fewer than [`MIN_ZSCORE_HISTORY`]
/// values or has no spread.
#[must_use]
pub fn calculate_zscore(current: f64, history: &[f64]) -> Option<ZScoreResult> {
    if history.len() < MIN_ZSCORE_HISTORY {
        return None;
    }

    let m = mean(history);
    let sd = standard_deviation(history);
    if !(sd > 0.0) {
        return None;
    }

    Some(ZScoreResult {
        mean: m,
        standard_deviation: sd,
        z_score: (current - m) / sd,
    })
}

/// Z-score of `current` against only the most recent `window` entries of `history`.
///
/// History is assumed to be ordered oldest first. The windowed slice must still
/// satisfy the [`calculate_zscore`] contract.
#[must_use]
pub fn rolling_zscore(current: f64, history: &[f64], window: usize) -> Option<ZScoreResult> {
    let start = history.len().saturating_sub(window);
    calculate_zscore(current, &history[start..])
}

/// Symmetric standard-deviation bands around a mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SdBands {
    pub mean: f64,
    pub standard_deviation: f64,
    pub plus_one: f64,
    pub minus_one: f64,
    pub plus_two: f64,
    pub minus_two: f64,
    pub plus_three: f64,
    pub minus_three: f64,
}

impl SdBands {
    /// Builds bands from a known mean and standard deviation.
    #[must_use]
    pub fn new(mean: f64, standard_deviation: f64) -> Self {
        Self {
            mean,
            standard_deviation,
            plus_one: mean + standard_deviation,
            minus_one: mean - standard_deviation,
            plus_two: mean + 2.0 * standard_deviation,
            minus_two: mean - 2.0 * standard_deviation,
            plus_three: mean + 3.0 * standard_deviation,
            minus_three: mean - 3.0 * standard_deviation,
        }
    }

    /// Builds bands from raw values using the sample standard deviation.
    ///
    /// Returns `None` for fewer than two values or zero spread.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        let sd = standard_deviation(values);
        if !(sd > 0.0) {
            return None;
        }
        Some(Self::new(mean(values), sd))
    }

    /// How many whole bands away from the mean `value` sits, signed.
    #[must_use]
    pub fn band_of(&self, value: f64) -> i32 {
        if !(self.standard_deviation > 0.0) {
            return 0;
        }
        let z = (value - self.mean) / self.standard_deviation;
        (z.trunc() as i32).clamp(-3, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    // ============================================
    // Aggregate Tests
    // ============================================

    #[test]
    fn mean_of_empty_is_zero() {
        assert!(mean(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_of_values() {
        assert!((mean(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn standard_deviation_degenerate_inputs_are_zero() {
        assert!(standard_deviation(&[]).abs() < f64::EPSILON);
        assert!(standard_deviation(&[42.0]).abs() < f64::EPSILON);
        assert!(population_standard_deviation(&[]).abs() < f64::EPSILON);
        assert!(population_standard_deviation(&[42.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn sample_and_population_denominators_differ() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // population variance = 4, sample variance = 32/7
        assert!((population_standard_deviation(&values) - 2.0).abs() < 1e-12);
        assert!((standard_deviation(&values) - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    // ============================================
    // Z-Score Tests
    // ============================================

    #[test]
    fn zscore_requires_twenty_points() {
        let history = sequence(19);
        assert!(calculate_zscore(10.0, &history).is_none());

        let history = sequence(20);
        assert!(calculate_zscore(10.0, &history).is_some());
    }

    #[test]
    fn zscore_requires_spread() {
        let history = vec![5.0; 30];
        assert!(calculate_zscore(5.0, &history).is_none());
    }

    #[test]
    fn zscore_at_mean_is_zero() {
        let history = sequence(21);
        let result = calculate_zscore(11.0, &history).unwrap();
        assert!((result.mean - 11.0).abs() < 1e-12);
        assert!(result.z_score.abs() < 1e-12);
    }

    #[test]
    fn rolling_zscore_uses_recent_window() {
        let history = sequence(200);
        let result = rolling_zscore(200.0, &history, 50).unwrap();

        // window is 151..=200, mean 175.5
        assert!((result.mean - 175.5).abs() < 1e-9);
        assert!(result.z_score > 0.0);
    }

    #[test]
    fn rolling_zscore_window_too_small_is_none() {
        let history = sequence(200);
        assert!(rolling_zscore(200.0, &history, 10).is_none());
    }

    #[test]
    fn rolling_zscore_window_larger_than_history_uses_all() {
        let history = sequence(25);
        let windowed = rolling_zscore(20.0, &history, 500).unwrap();
        let full = calculate_zscore(20.0, &history).unwrap();
        assert_eq!(windowed, full);
    }

    #[test]
    fn zscore_labels() {
        let make = |z| ZScoreResult {
            mean: 0.0,
            standard_deviation: 1.0,
            z_score: z,
        };

        assert!(!make(1.9).is_significant());
        assert!(make(2.0).is_significant());
        assert!(make(-2.5).is_significant());
        assert!(!make(2.9).is_extreme());
        assert!(make(-3.0).is_extreme());

        assert_eq!(make(3.2).description(), "Extremely High");
        assert_eq!(make(2.2).description(), "Significantly High");
        assert_eq!(make(1.2).description(), "Above Average");
        assert_eq!(make(0.0).description(), "Normal Range");
        assert_eq!(make(-1.2).description(), "Below Average");
        assert_eq!(make(-2.2).description(), "Significantly Low");
        assert_eq!(make(-3.2).description(), "Extremely Low");
    }

    #[test]
    fn zscore_formatting_is_signed() {
        let positive = ZScoreResult {
            mean: 0.0,
            standard_deviation: 1.0,
            z_score: 1.5,
        };
        let negative = ZScoreResult {
            z_score: -0.26,
            ..positive
        };
        assert_eq!(positive.formatted(), "+1.5σ");
        assert_eq!(negative.formatted(), "-0.3σ");
    }

    // ============================================
    // SD Band Tests
    // ============================================

    #[test]
    fn sd_bands_are_symmetric() {
        let bands = SdBands::new(100.0, 10.0);
        assert!((bands.plus_one - 110.0).abs() < f64::EPSILON);
        assert!((bands.minus_one - 90.0).abs() < f64::EPSILON);
        assert!((bands.plus_two - 120.0).abs() < f64::EPSILON);
        assert!((bands.minus_two - 80.0).abs() < f64::EPSILON);
        assert!((bands.plus_three - 130.0).abs() < f64::EPSILON);
        assert!((bands.minus_three - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sd_bands_from_values_requires_spread() {
        assert!(SdBands::from_values(&[1.0]).is_none());
        assert!(SdBands::from_values(&[3.0, 3.0, 3.0]).is_none());

        let bands = SdBands::from_values(&[1.0, 2.0, 3.0]).unwrap();
        assert!((bands.mean - 2.0).abs() < f64::EPSILON);
        assert!((bands.standard_deviation - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sd_band_of_value() {
        let bands = SdBands::new(0.0, 1.0);
        assert_eq!(bands.band_of(0.5), 0);
        assert_eq!(bands.band_of(1.5), 1);
        assert_eq!(bands.band_of(-2.5), -2);
        assert_eq!(bands.band_of(10.0), 3);
    }
}
