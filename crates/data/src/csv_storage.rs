use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Writer};
use risk_engine_core::{parse_date, PricePoint, RiskHistoryPoint};
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use crate::error::HistoryError;

#[derive(Deserialize)]
struct PriceRow {
    #[serde(alias = "timestamp")]
    date: String,
    #[serde(alias = "close")]
    price: f64,
}

pub struct CsvStorage;

impl CsvStorage {
    /// Reads a price history from CSV.
    ///
    /// Format: `date,price` with a header row. `timestamp` and `close` are
    /// accepted as column names, extra columns are ignored, and dates may be
    /// RFC 3339 timestamps or `YYYY-MM-DD`. Rows are returned sorted by date.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, a row is malformed, or
    /// a date cannot be parsed.
    pub fn read_prices(path: impl AsRef<Path>) -> Result<Vec<PricePoint>, HistoryError> {
        let file = File::open(path.as_ref())?;
        let prices = Self::read_prices_from(file)?;
        debug!(path = %path.as_ref().display(), rows = prices.len(), "Read price history");
        Ok(prices)
    }

    /// Same as [`CsvStorage::read_prices`] over any reader.
    ///
    /// # Errors
    /// Returns an error if a row is malformed or a date cannot be parsed.
    pub fn read_prices_from<R: Read>(reader: R) -> Result<Vec<PricePoint>, HistoryError> {
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut prices = Vec::new();

        for (index, result) in reader.deserialize::<PriceRow>().enumerate() {
            let row = result?;
            // header is line 1
            let line = index as u64 + 2;
            let date: DateTime<Utc> = parse_date(&row.date).ok_or_else(|| HistoryError::Parse {
                line,
                message: format!("unrecognised date {:?}", row.date),
            })?;
            prices.push(PricePoint::new(date, row.price));
        }

        prices.sort_by_key(|p| p.date);
        Ok(prices)
    }

    /// Writes a risk history series to CSV.
    ///
    /// Format: `date,risk_level,price,fair_value,deviation`, one row per day.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or writing fails.
    pub fn write_risk_history(
        path: impl AsRef<Path>,
        series: &[RiskHistoryPoint],
    ) -> Result<(), HistoryError> {
        let file = File::create(path.as_ref())?;
        Self::write_risk_history_to(file, series)?;
        debug!(path = %path.as_ref().display(), rows = series.len(), "Wrote risk history");
        Ok(())
    }

    /// Same as [`CsvStorage::write_risk_history`] over any writer.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_risk_history_to<W: Write>(
        writer: W,
        series: &[RiskHistoryPoint],
    ) -> Result<(), HistoryError> {
        let mut writer = Writer::from_writer(writer);
        writer.write_record(["date", "risk_level", "price", "fair_value", "deviation"])?;

        let mut sorted: Vec<&RiskHistoryPoint> = series.iter().collect();
        sorted.sort_by(|a, b| a.date_string.cmp(&b.date_string));

        for point in sorted {
            writer.write_record(&[
                point.date_string.clone(),
                format!("{:.4}", point.risk_level),
                point.price.to_string(),
                point.fair_value.to_string(),
                format!("{:.6}", point.deviation),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn reads_day_and_timestamp_rows_sorted() {
        let csv = "date,price\n2024-01-03,43000.5\n2024-01-01T12:00:00Z,42000\n2024-01-02,42500\n";
        let prices = CsvStorage::read_prices_from(csv.as_bytes()).unwrap();

        assert_eq!(prices.len(), 3);
        assert_eq!(
            prices[0].date,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        );
        assert!((prices[2].price - 43000.5).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_ohlcv_style_headers() {
        let csv = "timestamp,symbol,open,close\n2024-01-01,BTC,1,2\n";
        let prices = CsvStorage::read_prices_from(csv.as_bytes()).unwrap();
        assert!((prices[0].price - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_date_reports_line() {
        let csv = "date,price\n2024-01-01,1\nyesterday,2\n";
        let err = CsvStorage::read_prices_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, HistoryError::Parse { line: 3, .. }));
    }

    #[test]
    fn bad_price_is_csv_error() {
        let csv = "date,price\n2024-01-01,abc\n";
        let err = CsvStorage::read_prices_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, HistoryError::Csv(_)));
    }

    #[test]
    fn writes_risk_history_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("btc_risk.csv");
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let series = vec![
            RiskHistoryPoint::new(day(2), 0.61, 110.0, 100.0, 0.041_393),
            RiskHistoryPoint::new(day(1), 0.5, 100.0, 100.0, 0.0),
        ];

        CsvStorage::write_risk_history(&path, &series).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "date,risk_level,price,fair_value,deviation");
        assert_eq!(lines[1], "2024-01-01,0.5000,100,100,0.000000");
        assert_eq!(lines[2], "2024-01-02,0.6100,110,100,0.041393");
    }
}
