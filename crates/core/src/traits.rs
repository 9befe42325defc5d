use crate::confidence::ConfidenceMetrics;
use crate::error::StoreError;
use async_trait::async_trait;

/// Key-value persistence for per-asset confidence metrics.
///
/// Implementations only need get/put by asset id; `load_all` lets the tracker
/// warm its cache in one pass at startup.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn get(&self, asset_id: &str) -> Result<Option<ConfidenceMetrics>, StoreError>;

    async fn put(&self, metrics: &ConfidenceMetrics) -> Result<(), StoreError>;

    async fn load_all(&self) -> Result<Vec<ConfidenceMetrics>, StoreError>;
}
