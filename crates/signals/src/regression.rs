//! Logarithmic (power-law) regression of price against asset age.
//!
//! Fits `log10(price) = a + b * log10(days since origin)` by ordinary least
//! squares. The fitted curve is the asset's "fair value"; the signed log10
//! gap between the actual price and that curve is its deviation.

use chrono::{DateTime, Utc};
use risk_engine_core::{DeviationBounds, PricePoint};
use serde::{Deserialize, Serialize};

/// Minimum number of usable points for a fit.
pub const MIN_REGRESSION_POINTS: usize = 10;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Fractional days from `origin` to `date`, or `None` at or before origin.
#[must_use]
pub fn days_since(origin: &DateTime<Utc>, date: &DateTime<Utc>) -> Option<f64> {
    let days = (*date - *origin).num_seconds() as f64 / SECONDS_PER_DAY;
    (days > 0.0).then_some(days)
}

/// Fitted power-law curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Intercept in log10 space
    pub a: f64,
    /// Slope in log10 space
    pub b: f64,
    pub r_squared: f64,
    pub origin_date: DateTime<Utc>,
    /// Number of points that survived filtering
    pub data_points: usize,
}

impl RegressionResult {
    /// Fair value implied by the curve at `date`. Zero at or before origin.
    #[must_use]
    pub fn fair_value_at(&self, date: &DateTime<Utc>) -> f64 {
        match days_since(&self.origin_date, date) {
            Some(days) => 10f64.powf(self.a + self.b * days.log10()),
            None => 0.0,
        }
    }
}

/// Fits the regression over `history`.
///
/// Points at or before `origin` and points with non-positive price are
/// dropped. Returns `None` when fewer than [`MIN_REGRESSION_POINTS`] remain
/// or the surviving points share a single x value.
#[must_use]
pub fn fit(history: &[PricePoint], origin: DateTime<Utc>) -> Option<RegressionResult> {
    let points: Vec<(f64, f64)> = history
        .iter()
        .filter(|p| p.price > 0.0 && p.price.is_finite())
        .filter_map(|p| days_since(&origin, &p.date).map(|d| (d.log10(), p.price.log10())))
        .collect();

    if points.len() < MIN_REGRESSION_POINTS {
        tracing::debug!(
            usable = points.len(),
            required = MIN_REGRESSION_POINTS,
            "Not enough points for logarithmic regression"
        );
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });

    if sxx <= f64::EPSILON {
        return None;
    }

    let b = sxy / sxx;
    let a = mean_y - b * mean_x;

    let (ss_res, ss_tot) = points.iter().fold((0.0, 0.0), |(res, tot), (x, y)| {
        let predicted = a + b * x;
        (res + (y - predicted).powi(2), tot + (y - mean_y).powi(2))
    });

    // A flat series is fitted exactly by a zero slope
    let r_squared = if ss_tot <= f64::EPSILON {
        1.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    Some(RegressionResult {
        a,
        b,
        r_squared,
        origin_date: origin,
        data_points: points.len(),
    })
}

/// Signed log10 gap between `actual` and `fair_value`. Positive = overvalued.
///
/// Returns 0.0 if either input is non-positive.
#[must_use]
pub fn log_deviation(actual: f64, fair_value: f64) -> f64 {
    if actual <= 0.0 || fair_value <= 0.0 || !actual.is_finite() || !fair_value.is_finite() {
        return 0.0;
    }
    actual.log10() - fair_value.log10()
}

/// Maps a deviation linearly from `[bounds.low, bounds.high]` onto `[0, 1]`.
///
/// Values outside the bounds are clamped; zero maps to 0.5 for symmetric bounds.
#[must_use]
pub fn normalize_deviation(deviation: f64, bounds: &DeviationBounds) -> f64 {
    let width = bounds.width();
    if !(width > 0.0) || deviation.is_nan() {
        return 0.5;
    }
    ((deviation - bounds.low) / width).clamp(0.0, 1.0)
}
