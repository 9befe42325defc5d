use thiserror::Error;

/// Errors reading or writing price and risk history files.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row parsed as CSV but held an unusable value.
    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },
}
