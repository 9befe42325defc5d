//! Adaptive confidence.
//!
//! Tracks, per asset, how well the regression has fitted and how often
//! directional risk calls were borne out, and turns that record into a
//! confidence score that moves at most one step from the asset's baseline.

mod scoring;
mod tracker;

pub use scoring::{
    accuracy_bonus, bounded_confidence, data_point_bonus, evaluate_prediction, r_squared_bonus,
    ConfidenceBreakdown, NeutralBand, DATA_POINT_BASELINE, MAX_CONFIDENCE, MIN_CONFIDENCE,
    OUTCOME_MOVE_THRESHOLD, R_SQUARED_PIVOT,
};
pub use tracker::{CalculationInput, ConfidenceError, ConfidenceTracker, RecordOutcome};
