pub mod asset;
pub mod confidence;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod history;
pub mod statistics;
pub mod traits;

pub use asset::{builtin_assets, AssetRegistry, AssetRiskConfig, DeviationBounds};
pub use confidence::{ConfidenceMetrics, PredictionSnapshot, RSquaredEntry};
pub use config::{ConfidenceConfig, EngineConfig, ScoringConfig, StorageConfig};
pub use config_loader::ConfigLoader;
pub use error::{ConfigError, StoreError};
pub use history::{day_key, parse_date, start_of_day, utc_day, PricePoint, RiskHistoryPoint};
pub use statistics::{
    calculate_zscore, mean, population_standard_deviation, rolling_zscore, standard_deviation,
    SdBands, ZScoreResult,
};
pub use traits::MetricsStore;
