//! Per-asset risk history persistence.
//!
//! Each asset's series lives in `<dir>/<ASSET>.json` as a JSON array of
//! [`RiskHistoryPoint`]s, sorted by day with at most one point per day.
//! A missing or corrupt file reads as an empty series.

use risk_engine_core::RiskHistoryPoint;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::HistoryError;

/// Inserts `point` into a day-sorted series, replacing any point for the same day.
pub fn merge_point(series: &mut Vec<RiskHistoryPoint>, point: RiskHistoryPoint) {
    match series.binary_search_by(|p| p.date_string.cmp(&point.date_string)) {
        Ok(index) => series[index] = point,
        Err(index) => series.insert(index, point),
    }
}

/// Reads and writes risk history files under one directory.
#[derive(Debug, Clone)]
pub struct RiskHistoryStore {
    dir: PathBuf,
}

impl RiskHistoryStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, asset_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", asset_id.to_uppercase()))
    }

    /// Loads an asset's series, oldest first.
    ///
    /// # Errors
    /// Only fails when the file exists but cannot be opened. Unparseable
    /// content is logged and treated as an empty series.
    pub fn load(&self, asset_id: &str) -> Result<Vec<RiskHistoryPoint>, HistoryError> {
        let path = self.path_for(asset_id);
        if !path.exists() {
            debug!(path = %path.display(), "No risk history file, starting empty");
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        match serde_json::from_reader::<_, Vec<RiskHistoryPoint>>(BufReader::new(file)) {
            Ok(mut series) => {
                series.sort_by(|a, b| a.date_string.cmp(&b.date_string));
                series.dedup_by(|later, earlier| later.date_string == earlier.date_string);
                Ok(series)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse risk history, starting empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Replaces an asset's series on disk. Input is sorted and deduplicated first.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, asset_id: &str, series: &[RiskHistoryPoint]) -> Result<(), HistoryError> {
        let mut merged = Vec::with_capacity(series.len());
        for point in series {
            merge_point(&mut merged, point.clone());
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(asset_id);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, &merged)?;

        debug!(path = %path.display(), points = merged.len(), "Saved risk history");
        Ok(())
    }

    /// Adds or replaces the point for `point`'s day.
    ///
    /// # Errors
    /// Returns an error if the series cannot be read or written.
    pub fn upsert(&self, asset_id: &str, point: RiskHistoryPoint) -> Result<(), HistoryError> {
        self.upsert_many(asset_id, std::iter::once(point))
    }

    /// Merges many points into the stored series in one read and write.
    /// Later points win over earlier ones for the same day.
    ///
    /// # Errors
    /// Returns an error if the series cannot be read or written.
    pub fn upsert_many(
        &self,
        asset_id: &str,
        points: impl IntoIterator<Item = RiskHistoryPoint>,
    ) -> Result<(), HistoryError> {
        let mut series = self.load(asset_id)?;
        let before = series.len();
        for point in points {
            merge_point(&mut series, point);
        }
        self.save(asset_id, &series)?;

        info!(
            asset = %asset_id,
            added = series.len() - before,
            total = series.len(),
            "Updated risk history"
        );
        Ok(())
    }

    /// Deletes the asset's file if it exists.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self, asset_id: &str) -> Result<(), HistoryError> {
        let path = self.path_for(asset_id);
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(path = %path.display(), "Cleared risk history");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn point(day: i64, hour: i64, risk: f64) -> RiskHistoryPoint {
        let date = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
            + Duration::days(day)
            + Duration::hours(hour);
        RiskHistoryPoint::new(date, risk, 100.0 + day as f64, 95.0, 0.02)
    }

    // ============================================
    // Merge Tests
    // ============================================

    #[test]
    fn merge_keeps_series_sorted() {
        let mut series = Vec::new();
        merge_point(&mut series, point(3, 0, 0.3));
        merge_point(&mut series, point(1, 0, 0.1));
        merge_point(&mut series, point(2, 0, 0.2));

        let days: Vec<&str> = series.iter().map(|p| p.date_string.as_str()).collect();
        assert_eq!(days, vec!["2024-02-02", "2024-02-03", "2024-02-04"]);
    }

    #[test]
    fn merge_replaces_same_day() {
        let mut series = vec![point(1, 2, 0.1)];
        merge_point(&mut series, point(1, 20, 0.9));

        assert_eq!(series.len(), 1);
        assert!((series[0].risk_level - 0.9).abs() < f64::EPSILON);
    }

    // ============================================
    // Store Tests
    // ============================================

    #[test]
    fn upsert_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = RiskHistoryStore::new(dir.path().join("history"));

        store.upsert("btc", point(5, 0, 0.5)).unwrap();
        store.upsert("BTC", point(4, 0, 0.4)).unwrap();
        store.upsert("BTC", point(5, 6, 0.55)).unwrap();

        let series = store.load("BTC").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date_string, "2024-02-05");
        assert!((series[1].risk_level - 0.55).abs() < f64::EPSILON);
    }

    #[test]
    fn upsert_many_later_point_wins() {
        let dir = TempDir::new().unwrap();
        let store = RiskHistoryStore::new(dir.path());

        store
            .upsert_many("ETH", vec![point(1, 0, 0.1), point(2, 0, 0.2), point(1, 9, 0.15)])
            .unwrap();

        let series = store.load("ETH").unwrap();
        assert_eq!(series.len(), 2);
        assert!((series[0].risk_level - 0.15).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = RiskHistoryStore::new(dir.path());
        assert!(store.load("SOL").unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = RiskHistoryStore::new(dir.path());
        fs::write(store.path_for("SOL"), "[{\"date\": 12}]").unwrap();

        assert!(store.load("SOL").unwrap().is_empty());
    }

    #[test]
    fn file_uses_documented_keys() {
        let dir = TempDir::new().unwrap();
        let store = RiskHistoryStore::new(dir.path());
        store.upsert("ADA", point(0, 0, 0.3)).unwrap();

        let raw = fs::read_to_string(store.path_for("ADA")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let first = value[0].as_object().unwrap();
        assert_eq!(first["date"], "2024-02-01");
        assert!(first.contains_key("risk_level"));
        assert!(first.contains_key("fair_value"));
    }

    #[test]
    fn clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = RiskHistoryStore::new(dir.path());
        store.upsert("XRP", point(0, 0, 0.3)).unwrap();
        assert!(store.path_for("XRP").exists());

        store.clear("XRP").unwrap();
        assert!(!store.path_for("XRP").exists());
        store.clear("XRP").unwrap();
    }
}
