//! CLI commands for the risk engine.

pub mod assets;
pub mod backfill;
pub mod confidence;
pub mod history;
pub mod performance;
pub mod score;

pub use assets::{run_assets, AssetsArgs};
pub use backfill::{run_backfill, BackfillArgs};
pub use confidence::{run_confidence, ConfidenceArgs};
pub use history::{run_history, HistoryArgs};
pub use performance::{run_performance, PerformanceArgs};
pub use score::{run_score, ScoreArgs};
