//! Error types shared by the engine crates.

use thiserror::Error;

/// Errors from a [`MetricsStore`](crate::traits::MetricsStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error reading/writing the backing medium.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Invalid static configuration: asset definitions or weight presets.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("duplicate asset symbol: {0}")]
    DuplicateSymbol(String),

    #[error("duplicate external id: {0}")]
    DuplicateExternalId(String),

    #[error("duplicate exchange symbol: {0}")]
    DuplicateExchangeSymbol(String),

    #[error("deviation bounds for {asset} must be symmetric and nonzero, got ({low}, {high})")]
    InvalidBounds { asset: String, low: f64, high: f64 },

    #[error("confidence level for {asset} must be in [1, 9], got {level}")]
    InvalidConfidenceLevel { asset: String, level: u8 },

    #[error("factor weights must be non-negative and sum to 1.0, got sum {sum}")]
    InvalidWeights { sum: f64 },

    #[error("unknown weight preset: {0}")]
    UnknownPreset(String),

    #[error("unknown risk factor: {0}")]
    UnknownFactor(String),
}
