pub mod ledger;
pub mod metrics;
pub mod metrics_formatter;

pub use ledger::{
    read_transactions, read_value_history, Transaction, TransactionKind, ValueSnapshot,
};
pub use metrics::{MetricsCalculator, PerformanceMetrics};
pub use metrics_formatter::MetricsFormatter;
