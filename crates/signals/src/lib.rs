pub mod aggregator;
pub mod confidence;
pub mod factor;
pub mod normalizer;
pub mod regression;

// Re-export the scoring pipeline for convenience
pub use aggregator::{
    MultiFactorRiskAggregator, MultiFactorRiskPoint, RiskCategory, SupplementaryIndicators,
};
pub use factor::{RiskFactor, RiskFactorType, RiskFactorWeights, WEIGHT_TOLERANCE};
pub use normalizer::RiskFactorNormalizer;
pub use regression::{
    days_since, fit, log_deviation, normalize_deviation, RegressionResult, MIN_REGRESSION_POINTS,
};

// Re-export confidence tracking
pub use confidence::{
    evaluate_prediction, CalculationInput, ConfidenceBreakdown, ConfidenceError,
    ConfidenceTracker, NeutralBand, RecordOutcome,
};
