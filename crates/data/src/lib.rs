//! Persistence for the risk engine.
//!
//! This crate provides:
//! - `MetricsStore` implementations for confidence metrics (in-memory and JSON files)
//! - A per-asset risk history store with one point per UTC day
//! - CSV readers and writers for price and risk history series

pub mod csv_storage;
pub mod error;
pub mod metrics_store;
pub mod risk_history;

pub use csv_storage::CsvStorage;
pub use error::HistoryError;
pub use metrics_store::{InMemoryMetricsStore, JsonFileMetricsStore};
pub use risk_history::{merge_point, RiskHistoryStore};
