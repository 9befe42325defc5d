use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use risk_engine_core::{
    AssetRegistry, ConfidenceConfig, ConfidenceMetrics, MetricsStore, PredictionSnapshot,
    RSquaredEntry, StoreError,
};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::scoring::{ConfidenceBreakdown, NeutralBand};
use crate::aggregator::MultiFactorRiskPoint;
use crate::regression::RegressionResult;

const STOP_POLL: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum ConfidenceError {
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    #[error("metrics store error: {0}")]
    Store(#[from] StoreError),
}

/// One scoring pass as seen by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationInput {
    /// Symbol or external id; resolved through the registry
    pub asset_id: String,
    pub r_squared: f64,
    pub data_point_count: usize,
    pub risk_level: f64,
    pub price: f64,
    pub date: DateTime<Utc>,
}

impl CalculationInput {
    /// Builds the input from a regression fit and the risk point scored with it.
    #[must_use]
    pub fn from_point(
        asset_id: impl Into<String>,
        fit: &RegressionResult,
        point: &MultiFactorRiskPoint,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            r_squared: fit.r_squared,
            data_point_count: fit.data_points,
            risk_level: point.risk_level,
            price: point.price,
            date: point.date,
        }
    }
}

/// What a call to [`ConfidenceTracker::record_calculation`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    pub snapshot_recorded: bool,
    pub predictions_resolved: usize,
}

struct Entry {
    metrics: ConfidenceMetrics,
    dirty: bool,
}

type Slot = Arc<Mutex<Entry>>;

/// Owns every asset's [`ConfidenceMetrics`].
///
/// Each asset has its own async mutex, so updates to one asset are
/// serialized while different assets proceed independently. The outer map
/// lock is only held long enough to find or insert a slot.
pub struct ConfidenceTracker {
    store: Option<Arc<dyn MetricsStore>>,
    registry: AssetRegistry,
    config: ConfidenceConfig,
    entries: RwLock<HashMap<String, Slot>>,
}

impl ConfidenceTracker {
    /// Creates a tracker backed by `store`, warming the cache from it.
    ///
    /// A store that fails to list its records is logged and the cache starts
    /// cold. Assets missing from the cache are read from the store one at a
    /// time on first use, so a failed warm-up never replaces stored history.
    pub async fn load(
        store: Arc<dyn MetricsStore>,
        registry: AssetRegistry,
        config: ConfidenceConfig,
    ) -> Self {
        let mut entries: HashMap<String, Slot> = HashMap::new();

        match store.load_all().await {
            Ok(records) => {
                for metrics in records {
                    let Some(asset) = registry.resolve(&metrics.asset_id) else {
                        warn!(asset = %metrics.asset_id, "Ignoring metrics for unconfigured asset");
                        continue;
                    };
                    let asset_id = asset.asset_id.clone();
                    let metrics = ConfidenceMetrics {
                        asset_id: asset_id.clone(),
                        ..metrics
                    };
                    entries.insert(asset_id, new_slot(metrics));
                }
                info!(assets = entries.len(), "Loaded confidence metrics");
            }
            Err(e) => {
                warn!(error = %e, "Failed to load confidence metrics, starting from baseline");
            }
        }

        Self {
            store: Some(store),
            registry,
            config,
            entries: RwLock::new(entries),
        }
    }

    /// Creates a tracker with no persistence.
    #[must_use]
    pub fn in_memory(registry: AssetRegistry, config: ConfidenceConfig) -> Self {
        Self {
            store: None,
            registry,
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &ConfidenceConfig {
        &self.config
    }

    /// Configured flush cadence, never shorter than one second.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.config.flush_interval_secs.max(1))
    }

    fn band(&self) -> NeutralBand {
        NeutralBand::new(self.config.neutral_band_low, self.config.neutral_band_high)
    }

    fn canonical_id(&self, key: &str) -> Result<String, ConfidenceError> {
        self.registry
            .resolve(key)
            .map(|asset| asset.asset_id.clone())
            .ok_or_else(|| ConfidenceError::UnknownAsset(key.to_string()))
    }

    /// Cached slot for `asset_id`, reading it from the store on a miss.
    async fn cached_slot(&self, asset_id: &str) -> Result<Option<Slot>, ConfidenceError> {
        if let Some(slot) = self.entries.read().await.get(asset_id) {
            return Ok(Some(Arc::clone(slot)));
        }

        let Some(store) = &self.store else {
            return Ok(None);
        };
        let Some(stored) = store.get(asset_id).await? else {
            return Ok(None);
        };
        debug!(asset = %asset_id, "Loaded confidence metrics from store");

        let metrics = ConfidenceMetrics {
            asset_id: asset_id.to_string(),
            ..stored
        };
        let mut entries = self.entries.write().await;
        let slot = entries
            .entry(asset_id.to_string())
            .or_insert_with(|| new_slot(metrics));
        Ok(Some(Arc::clone(slot)))
    }

    /// Slot for `asset_id`, created empty only when the store has no record.
    ///
    /// A store read error is returned rather than starting fresh, since a
    /// fresh record would overwrite the stored one on the next flush.
    async fn slot(&self, asset_id: &str) -> Result<Slot, ConfidenceError> {
        if let Some(slot) = self.cached_slot(asset_id).await? {
            return Ok(slot);
        }

        let mut entries = self.entries.write().await;
        let slot = entries
            .entry(asset_id.to_string())
            .or_insert_with(|| new_slot(ConfidenceMetrics::new(asset_id)));
        Ok(Arc::clone(slot))
    }

    /// Records one scoring pass.
    ///
    /// In order: grades every pending snapshot at least `outcome_horizon_days`
    /// old against this price, appends the R² value, then records a snapshot
    /// if the risk level is directional and none exists yet for this UTC day.
    ///
    /// # Errors
    /// Returns [`ConfidenceError::UnknownAsset`] if the asset is not
    /// configured, or [`ConfidenceError::Store`] if `flush_on_mutation` is set
    /// and the write fails. A failed write leaves the record dirty.
    pub async fn record_calculation(
        &self,
        input: CalculationInput,
    ) -> Result<RecordOutcome, ConfidenceError> {
        let asset_id = self.canonical_id(&input.asset_id)?;
        let slot = self.slot(&asset_id).await?;
        let mut entry = slot.lock().await;

        let band = self.band();
        let mut outcome = RecordOutcome::default();

        if input.price > 0.0 && input.price.is_finite() {
            let horizon = chrono::Duration::days(self.config.outcome_horizon_days);
            for snapshot in entry
                .metrics
                .prediction_snapshots
                .iter_mut()
                .filter(|s| !s.is_resolved() && input.date - s.date >= horizon)
            {
                let correct = band.evaluate(snapshot.risk_level, snapshot.price, input.price);
                snapshot.outcome_price = Some(input.price);
                snapshot.outcome_date = Some(input.date);
                snapshot.was_correct = Some(correct);
                outcome.predictions_resolved += 1;
            }
        }

        let r_squared = if input.r_squared.is_finite() {
            input.r_squared.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let history = &mut entry.metrics.r_squared_history;
        history.push(RSquaredEntry {
            date: input.date,
            r_squared,
        });
        let max_history = self.config.max_rsquared_history.max(1);
        if history.len() > max_history {
            let excess = history.len() - max_history;
            history.drain(..excess);
        }

        if !band.is_directional(input.risk_level) {
            debug!(asset = %asset_id, risk_level = input.risk_level, "Neutral risk, no snapshot");
        } else if entry.metrics.has_snapshot_on(&input.date) {
            debug!(asset = %asset_id, "Snapshot already recorded today");
        } else {
            entry.metrics.prediction_snapshots.push(PredictionSnapshot::new(
                input.date,
                input.risk_level,
                input.price,
            ));
            outcome.snapshot_recorded = true;
            debug!(
                asset = %asset_id,
                risk_level = input.risk_level,
                "Recorded prediction snapshot"
            );
        }

        entry.metrics.data_point_count = input.data_point_count;
        entry.metrics.last_updated = Some(input.date);
        entry.dirty = true;

        if outcome.predictions_resolved > 0 {
            info!(
                asset = %asset_id,
                resolved = outcome.predictions_resolved,
                accuracy = ?entry.metrics.historical_accuracy(),
                "Graded prediction snapshots"
            );
        }

        if self.config.flush_on_mutation {
            if let Some(store) = &self.store {
                store.put(&entry.metrics).await?;
                entry.dirty = false;
            }
        }

        Ok(outcome)
    }

    /// Static and adaptive confidence for an asset.
    ///
    /// An asset with no recorded history reports its static baseline.
    ///
    /// # Errors
    /// Returns [`ConfidenceError::UnknownAsset`] if the asset is not configured.
    pub async fn compute_confidence(
        &self,
        asset_id: &str,
    ) -> Result<ConfidenceBreakdown, ConfidenceError> {
        let asset = self
            .registry
            .resolve(asset_id)
            .ok_or_else(|| ConfidenceError::UnknownAsset(asset_id.to_string()))?;

        let slot = match self.cached_slot(&asset.asset_id).await {
            Ok(slot) => slot,
            Err(e) => {
                warn!(asset = %asset.asset_id, error = %e, "Metrics unreadable, using baseline");
                None
            }
        };
        let breakdown = match slot {
            Some(slot) => {
                let entry = slot.lock().await;
                ConfidenceBreakdown::compute(asset, &entry.metrics, self.config.rsquared_window)
            }
            None => ConfidenceBreakdown::compute(
                asset,
                &ConfidenceMetrics::new(&asset.asset_id),
                self.config.rsquared_window,
            ),
        };
        Ok(breakdown)
    }

    /// Copy of an asset's current metrics, if any have been recorded or stored.
    pub async fn metrics(&self, asset_id: &str) -> Option<ConfidenceMetrics> {
        let asset_id = self.canonical_id(asset_id).ok()?;
        let slot = self.cached_slot(&asset_id).await.ok()??;
        let entry = slot.lock().await;
        Some(entry.metrics.clone())
    }

    /// Writes every dirty record to the store. Returns how many were written.
    ///
    /// # Errors
    /// Stops at the first failed write and returns it; that record and any
    /// not yet visited stay dirty.
    pub async fn flush(&self) -> Result<usize, ConfidenceError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let slots: Vec<Slot> = self.entries.read().await.values().cloned().collect();
        let mut flushed = 0;
        for slot in slots {
            let mut entry = slot.lock().await;
            if !entry.dirty {
                continue;
            }
            store.put(&entry.metrics).await?;
            entry.dirty = false;
            flushed += 1;
        }

        if flushed > 0 {
            info!(assets = flushed, "Flushed confidence metrics");
        }
        Ok(flushed)
    }

    /// Flushes on a fixed interval until `stop` is set, then flushes once more.
    ///
    /// The flag is polled between ticks, so stopping never waits out a full
    /// interval.
    pub fn spawn_flush_task(
        self: Arc<Self>,
        interval: Duration,
        stop: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs_f64(), "Confidence flush task started");

            loop {
                let stopping = wait_or_stop(interval, &stop).await;

                if let Err(e) = self.flush().await {
                    warn!(error = %e, "Confidence flush failed");
                }

                if stopping {
                    info!("Confidence flush task stopped");
                    return;
                }
            }
        })
    }
}

fn new_slot(metrics: ConfidenceMetrics) -> Slot {
    Arc::new(Mutex::new(Entry {
        metrics,
        dirty: false,
    }))
}

/// Sleeps for `interval` in short steps. Returns true as soon as `stop` is set.
async fn wait_or_stop(interval: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if stop.load(Ordering::Relaxed) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(STOP_POLL.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use risk_engine_core::AssetRiskConfig;
    use risk_engine_data::InMemoryMetricsStore;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + ChronoDuration::days(n)
    }

    fn input(
        asset: &str,
        r_squared: f64,
        risk_level: f64,
        price: f64,
        date: DateTime<Utc>,
    ) -> CalculationInput {
        CalculationInput {
            asset_id: asset.to_string(),
            r_squared,
            data_point_count: 500,
            risk_level,
            price,
            date,
        }
    }

    fn tracker() -> ConfidenceTracker {
        ConfidenceTracker::in_memory(AssetRegistry::default(), ConfidenceConfig::default())
    }

    fn registry_with_baseline(symbol: &str, baseline: u8) -> AssetRegistry {
        let mut asset: AssetRiskConfig = AssetRegistry::default().by_symbol("BTC").unwrap().clone();
        asset.asset_id = symbol.to_string();
        asset.gecko_id = symbol.to_lowercase();
        asset.binance_symbol = format!("{symbol}USDT");
        asset.confidence_level = baseline;
        AssetRegistry::with_assets(vec![asset]).unwrap()
    }

    async fn backed_by(store: Arc<InMemoryMetricsStore>) -> ConfidenceTracker {
        ConfidenceTracker::load(store, AssetRegistry::default(), ConfidenceConfig::default()).await
    }

    struct FailingStore;

    #[async_trait]
    impl MetricsStore for FailingStore {
        async fn get(&self, _asset_id: &str) -> Result<Option<ConfidenceMetrics>, StoreError> {
            Err(StoreError::Backend("unavailable".to_string()))
        }

        async fn put(&self, _metrics: &ConfidenceMetrics) -> Result<(), StoreError> {
            Err(StoreError::Backend("unavailable".to_string()))
        }

        async fn load_all(&self) -> Result<Vec<ConfidenceMetrics>, StoreError> {
            Err(StoreError::Backend("corrupt".to_string()))
        }
    }

    /// Reads and writes through to `inner` but cannot list its records.
    struct UnlistableStore {
        inner: Arc<InMemoryMetricsStore>,
    }

    #[async_trait]
    impl MetricsStore for UnlistableStore {
        async fn get(&self, asset_id: &str) -> Result<Option<ConfidenceMetrics>, StoreError> {
            self.inner.get(asset_id).await
        }

        async fn put(&self, metrics: &ConfidenceMetrics) -> Result<(), StoreError> {
            self.inner.put(metrics).await
        }

        async fn load_all(&self) -> Result<Vec<ConfidenceMetrics>, StoreError> {
            Err(StoreError::Backend("listing failed".to_string()))
        }
    }

    // ============================================
    // Recording Tests
    // ============================================

    #[tokio::test]
    async fn no_history_reports_static_baseline() {
        let tracker = tracker();
        let breakdown = tracker.compute_confidence("BTC").await.unwrap();

        assert_eq!(breakdown.static_confidence, 8);
        assert_eq!(breakdown.adaptive_confidence, 8);
        assert!(tracker.metrics("BTC").await.is_none());
    }

    #[tokio::test]
    async fn same_day_records_one_snapshot_and_two_r_squared() {
        let tracker = tracker();

        let first = tracker
            .record_calculation(input("BTC", 0.9, 0.8, 100.0, day(0)))
            .await
            .unwrap();
        let second = tracker
            .record_calculation(input("BTC", 0.91, 0.85, 101.0, day(0) + ChronoDuration::hours(3)))
            .await
            .unwrap();

        assert!(first.snapshot_recorded);
        assert!(!second.snapshot_recorded);

        let metrics = tracker.metrics("BTC").await.unwrap();
        assert_eq!(metrics.prediction_snapshots.len(), 1);
        assert_eq!(metrics.r_squared_history.len(), 2);
    }

    #[tokio::test]
    async fn neutral_risk_records_r_squared_only() {
        let tracker = tracker();
        tracker
            .record_calculation(input("ETH", 0.9, 0.5, 100.0, day(0)))
            .await
            .unwrap();

        let metrics = tracker.metrics("ETH").await.unwrap();
        assert!(metrics.prediction_snapshots.is_empty());
        assert_eq!(metrics.r_squared_history.len(), 1);
    }

    #[tokio::test]
    async fn lookup_is_by_symbol_or_external_id() {
        let tracker = tracker();
        tracker
            .record_calculation(input("bitcoin", 0.9, 0.8, 100.0, day(0)))
            .await
            .unwrap();
        tracker
            .record_calculation(input("btc", 0.9, 0.8, 100.0, day(1)))
            .await
            .unwrap();

        let metrics = tracker.metrics("BTC").await.unwrap();
        assert_eq!(metrics.asset_id, "BTC");
        assert_eq!(metrics.prediction_snapshots.len(), 2);
    }

    #[tokio::test]
    async fn unknown_asset_is_an_error() {
        let tracker = tracker();
        let result = tracker
            .record_calculation(input("NOPE", 0.9, 0.8, 100.0, day(0)))
            .await;
        assert!(matches!(result, Err(ConfidenceError::UnknownAsset(_))));
        assert!(matches!(
            tracker.compute_confidence("NOPE").await,
            Err(ConfidenceError::UnknownAsset(_))
        ));
    }

    #[tokio::test]
    async fn r_squared_history_is_capped() {
        let config = ConfidenceConfig {
            max_rsquared_history: 5,
            ..ConfidenceConfig::default()
        };
        let tracker = ConfidenceTracker::in_memory(AssetRegistry::default(), config);

        for i in 0..8_i32 {
            tracker
                .record_calculation(input(
                    "SOL",
                    f64::from(i) / 10.0,
                    0.5,
                    100.0,
                    day(i64::from(i)),
                ))
                .await
                .unwrap();
        }

        let metrics = tracker.metrics("SOL").await.unwrap();
        assert_eq!(metrics.r_squared_history.len(), 5);
        assert!((metrics.r_squared_history[0].r_squared - 0.3).abs() < 1e-12);
    }

    // ============================================
    // Resolution Tests
    // ============================================

    #[tokio::test]
    async fn snapshot_is_graded_after_horizon() {
        let tracker = tracker();
        tracker
            .record_calculation(input("BTC", 0.9, 0.8, 100.0, day(0)))
            .await
            .unwrap();

        let early = tracker
            .record_calculation(input("BTC", 0.9, 0.5, 80.0, day(10)))
            .await
            .unwrap();
        assert_eq!(early.predictions_resolved, 0);

        let due = tracker
            .record_calculation(input("BTC", 0.9, 0.5, 90.0, day(30)))
            .await
            .unwrap();
        assert_eq!(due.predictions_resolved, 1);

        let metrics = tracker.metrics("BTC").await.unwrap();
        let snapshot = &metrics.prediction_snapshots[0];
        assert_eq!(snapshot.was_correct, Some(true));
        assert_eq!(snapshot.outcome_price, Some(90.0));
        assert_eq!(metrics.historical_accuracy(), Some(1.0));

        // graded snapshots are not graded again
        let later = tracker
            .record_calculation(input("BTC", 0.9, 0.5, 500.0, day(60)))
            .await
            .unwrap();
        assert_eq!(later.predictions_resolved, 0);
    }

    #[tokio::test]
    async fn wrong_calls_lower_confidence_by_at_most_one() {
        let tracker = tracker();
        for n in 0..5 {
            tracker
                .record_calculation(input("BTC", 0.1, 0.9, 100.0, day(n * 31)))
                .await
                .unwrap();
        }

        let breakdown = tracker.compute_confidence("BTC").await.unwrap();
        assert_eq!(breakdown.graded_predictions, 4);
        assert_eq!(breakdown.historical_accuracy, Some(0.0));
        assert!(breakdown.raw_score < 7.0);
        assert_eq!(breakdown.adaptive_confidence, 7);
    }

    // ============================================
    // Floor and Ceiling Tests
    // ============================================

    #[tokio::test]
    async fn floor_never_goes_below_one() {
        let tracker = ConfidenceTracker::in_memory(
            registry_with_baseline("LOW", 1),
            ConfidenceConfig::default(),
        );
        for n in 0..4 {
            tracker
                .record_calculation(input("LOW", 0.0, 0.1, 100.0, day(n * 31)))
                .await
                .unwrap();
        }

        let breakdown = tracker.compute_confidence("LOW").await.unwrap();
        assert!(breakdown.raw_score < 1.0);
        assert_eq!(breakdown.adaptive_confidence, 1);
    }

    #[tokio::test]
    async fn ceiling_never_exceeds_nine() {
        let tracker = ConfidenceTracker::in_memory(
            registry_with_baseline("TOP", 9),
            ConfidenceConfig::default(),
        );
        let mut price = 100.0;
        for n in 0..4 {
            let mut calc = input("TOP", 1.0, 0.1, price, day(n * 31));
            calc.data_point_count = 10_000;
            tracker.record_calculation(calc).await.unwrap();
            price *= 1.5;
        }

        let breakdown = tracker.compute_confidence("TOP").await.unwrap();
        assert_eq!(breakdown.historical_accuracy, Some(1.0));
        assert!(breakdown.raw_score > 10.0);
        assert_eq!(breakdown.adaptive_confidence, 9);
    }

    // ============================================
    // Persistence Tests
    // ============================================

    #[tokio::test]
    async fn flush_then_load_restores_metrics() {
        let store = Arc::new(InMemoryMetricsStore::new());
        let tracker = backed_by(store.clone()).await;

        tracker
            .record_calculation(input("ETH", 0.95, 0.2, 100.0, day(0)))
            .await
            .unwrap();
        assert!(store.get("ETH").await.unwrap().is_none());

        assert_eq!(tracker.flush().await.unwrap(), 1);
        assert_eq!(tracker.flush().await.unwrap(), 0);

        let reloaded = backed_by(store).await;
        assert_eq!(reloaded.metrics("ETH").await, tracker.metrics("ETH").await);
    }

    #[tokio::test]
    async fn flush_on_mutation_writes_immediately() {
        let store = Arc::new(InMemoryMetricsStore::new());
        let config = ConfidenceConfig {
            flush_on_mutation: true,
            ..ConfidenceConfig::default()
        };
        let tracker =
            ConfidenceTracker::load(store.clone(), AssetRegistry::default(), config).await;

        tracker
            .record_calculation(input("ADA", 0.9, 0.8, 1.0, day(0)))
            .await
            .unwrap();

        let stored = store.get("ADA").await.unwrap().unwrap();
        assert_eq!(stored.r_squared_history.len(), 1);
        assert_eq!(tracker.flush().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failing_store_reports_baseline_and_refuses_writes() {
        let tracker = ConfidenceTracker::load(
            Arc::new(FailingStore),
            AssetRegistry::default(),
            ConfidenceConfig::default(),
        )
        .await;

        let breakdown = tracker.compute_confidence("DOGE").await.unwrap();
        assert_eq!(breakdown.adaptive_confidence, breakdown.static_confidence);

        let result = tracker
            .record_calculation(input("DOGE", 0.9, 0.8, 1.0, day(0)))
            .await;
        assert!(matches!(result, Err(ConfidenceError::Store(_))));
        assert_eq!(tracker.flush().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_warm_up_keeps_stored_history() {
        let inner = Arc::new(InMemoryMetricsStore::new());
        let seeded = backed_by(Arc::clone(&inner)).await;
        for n in 0..5 {
            seeded
                .record_calculation(input("BTC", 0.9, 0.8, 100.0, day(n)))
                .await
                .unwrap();
        }
        seeded.flush().await.unwrap();

        let tracker = ConfidenceTracker::load(
            Arc::new(UnlistableStore {
                inner: Arc::clone(&inner),
            }),
            AssetRegistry::default(),
            ConfidenceConfig::default(),
        )
        .await;

        let before = tracker.metrics("BTC").await.unwrap();
        assert_eq!(before.r_squared_history.len(), 5);

        tracker
            .record_calculation(input("BTC", 0.9, 0.8, 100.0, day(5)))
            .await
            .unwrap();
        tracker.flush().await.unwrap();

        let stored = inner.get("BTC").await.unwrap().unwrap();
        assert_eq!(stored.r_squared_history.len(), 6);
        assert_eq!(stored.prediction_snapshots.len(), 6);
    }

    #[tokio::test]
    async fn flush_task_flushes_once_more_on_stop() {
        let store = Arc::new(InMemoryMetricsStore::new());
        let tracker = Arc::new(backed_by(store.clone()).await);
        tracker
            .record_calculation(input("LINK", 0.9, 0.3, 10.0, day(0)))
            .await
            .unwrap();

        let stop = Arc::new(AtomicBool::new(true));
        let handle = Arc::clone(&tracker).spawn_flush_task(Duration::from_millis(10), stop);
        handle.await.unwrap();

        assert!(store.get("LINK").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn flush_task_stops_without_waiting_out_interval() {
        let store = Arc::new(InMemoryMetricsStore::new());
        let tracker = Arc::new(backed_by(store.clone()).await);
        tracker
            .record_calculation(input("DOGE", 0.9, 0.3, 0.1, day(0)))
            .await
            .unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let handle =
            Arc::clone(&tracker).spawn_flush_task(Duration::from_secs(3600), Arc::clone(&stop));
        stop.store(true, Ordering::Relaxed);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(store.get("DOGE").await.unwrap().is_some());
    }

    // ============================================
    // Concurrency Tests
    // ============================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_to_one_asset_are_serialized() {
        let tracker = Arc::new(tracker());
        let mut handles = Vec::new();

        for i in 0..32 {
            let tracker = Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                tracker
                    .record_calculation(input(
                        "AVAX",
                        0.9,
                        0.8,
                        100.0,
                        day(0) + ChronoDuration::minutes(i),
                    ))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let metrics = tracker.metrics("AVAX").await.unwrap();
        assert_eq!(metrics.r_squared_history.len(), 32);
        assert_eq!(metrics.prediction_snapshots.len(), 1);
    }
}
