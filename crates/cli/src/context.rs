//! Shared state for CLI commands: configuration, the asset registry, and
//! the on-disk stores under the configured data directory.

use anyhow::{anyhow, Context, Result};
use risk_engine_core::{AssetRegistry, AssetRiskConfig, EngineConfig};
use risk_engine_data::{JsonFileMetricsStore, RiskHistoryStore};
use risk_engine_signals::{ConfidenceTracker, MultiFactorRiskAggregator};
use std::path::PathBuf;
use std::sync::Arc;

pub struct EngineContext {
    pub config: EngineConfig,
    pub registry: AssetRegistry,
    pub aggregator: MultiFactorRiskAggregator,
}

impl EngineContext {
    /// Validates the configured assets and scoring weights.
    ///
    /// # Errors
    /// Returns an error if either is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let registry = AssetRegistry::extended(config.assets.clone())
            .context("Invalid asset configuration")?;
        let aggregator = MultiFactorRiskAggregator::from_config(&config.scoring)
            .context("Invalid scoring configuration")?;

        Ok(Self {
            config,
            registry,
            aggregator,
        })
    }

    /// Looks up an asset by symbol, CoinGecko id or Binance symbol.
    ///
    /// # Errors
    /// Returns an error naming the key if no asset matches.
    pub fn resolve(&self, key: &str) -> Result<&AssetRiskConfig> {
        self.registry.resolve(key).ok_or_else(|| {
            anyhow!("Unknown asset '{key}'. Run `risk-engine assets` to list supported assets")
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.storage.data_dir)
    }

    pub fn history_store(&self) -> RiskHistoryStore {
        RiskHistoryStore::new(self.data_dir().join("risk_history"))
    }

    pub fn metrics_store(&self) -> JsonFileMetricsStore {
        JsonFileMetricsStore::new(self.data_dir().join("confidence"))
    }

    /// Tracker warmed from the JSON metrics store.
    pub async fn tracker(&self) -> ConfidenceTracker {
        ConfidenceTracker::load(
            Arc::new(self.metrics_store()),
            self.registry.clone(),
            self.config.confidence.clone(),
        )
        .await
    }
}
