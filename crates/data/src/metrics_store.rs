//! Confidence metrics persistence.
//!
//! Two [`MetricsStore`] backends:
//!
//! - [`InMemoryMetricsStore`] for tests and ephemeral runs
//! - [`JsonFileMetricsStore`], one pretty-printed JSON file per asset
//!
//! The file store tolerates missing and corrupt files: a missing directory
//! is an empty store, and a file that fails to parse is logged and skipped
//! so the tracker falls back to baseline confidence for that asset. Listing
//! also skips entries that cannot be read at all.

use async_trait::async_trait;
use risk_engine_core::{ConfidenceMetrics, MetricsStore, StoreError};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const METRICS_EXTENSION: &str = "json";

/// Keeps metrics in a map; nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    records: RwLock<HashMap<String, ConfidenceMetrics>>,
}

impl InMemoryMetricsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn get(&self, asset_id: &str) -> Result<Option<ConfidenceMetrics>, StoreError> {
        Ok(self.records.read().await.get(asset_id).cloned())
    }

    async fn put(&self, metrics: &ConfidenceMetrics) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(metrics.asset_id.clone(), metrics.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<ConfidenceMetrics>, StoreError> {
        let mut all: Vec<ConfidenceMetrics> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        Ok(all)
    }
}

/// Stores each asset's metrics in `<dir>/<ASSET>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileMetricsStore {
    dir: PathBuf,
}

impl JsonFileMetricsStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds `asset_id`'s metrics.
    ///
    /// # Errors
    /// Rejects ids that are empty or contain anything other than ASCII
    /// letters, digits, `-` and `_`.
    pub fn path_for(&self, asset_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !asset_id.is_empty()
            && asset_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::Backend(format!(
                "asset id {asset_id:?} is not usable as a file name"
            )));
        }
        Ok(self.dir.join(format!("{asset_id}.{METRICS_EXTENSION}")))
    }

    async fn read_file(path: &Path) -> Result<Option<ConfidenceMetrics>, StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<ConfidenceMetrics>(&bytes) {
            Ok(metrics) => Ok(Some(metrics)),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt confidence metrics file, ignoring"
                );
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl MetricsStore for JsonFileMetricsStore {
    async fn get(&self, asset_id: &str) -> Result<Option<ConfidenceMetrics>, StoreError> {
        let path = self.path_for(asset_id)?;
        Self::read_file(&path).await
    }

    /// Writes to a temporary file first, then renames it over the old one.
    async fn put(&self, metrics: &ConfidenceMetrics) -> Result<(), StoreError> {
        let path = self.path_for(&metrics.asset_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_vec_pretty(metrics)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(
            path = %path.display(),
            r_squared_entries = metrics.r_squared_history.len(),
            snapshots = metrics.prediction_snapshots.len(),
            "Saved confidence metrics"
        );
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<ConfidenceMetrics>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "No metrics directory, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut all = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(METRICS_EXTENSION) {
                continue;
            }
            match Self::read_file(&path).await {
                Ok(Some(metrics)) => all.push(metrics),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Unreadable metrics entry, skipping"
                    );
                }
            }
        }

        all.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        Ok(all)
    }
}
