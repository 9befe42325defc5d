//! Price inputs and persisted risk history records.
//!
//! Calendar days are always UTC days. A [`RiskHistoryPoint`] is identified by
//! its day key, so an asset's history holds at most one point per UTC day.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Format of a day key, e.g. `2024-03-14`.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// UTC calendar day of a timestamp.
#[must_use]
pub fn utc_day(date: &DateTime<Utc>) -> NaiveDate {
    date.date_naive()
}

/// Day key (`YYYY-MM-DD`) of a timestamp's UTC calendar day.
#[must_use]
pub fn day_key(date: &DateTime<Utc>) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Midnight UTC at the start of the timestamp's day.
#[must_use]
pub fn start_of_day(date: &DateTime<Utc>) -> DateTime<Utc> {
    date.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(*date, |dt| Utc.from_utc_datetime(&dt))
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` day (midnight UTC).
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, DAY_KEY_FORMAT)
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// A single price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    #[must_use]
    pub fn new(date: DateTime<Utc>, price: f64) -> Self {
        Self { date, price }
    }
}

/// Day-granular risk record used for charting and persistence.
///
/// Serializes with the keys `date`, `risk_level`, `price`, `fair_value` and
/// `deviation`, where `date` is the day key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RiskHistoryRecord", into = "RiskHistoryRecord")]
pub struct RiskHistoryPoint {
    pub date_string: String,
    pub date: DateTime<Utc>,
    pub risk_level: f64,
    pub price: f64,
    pub fair_value: f64,
    pub deviation: f64,
}

impl RiskHistoryPoint {
    /// Creates a point; the date is truncated to the start of its UTC day.
    #[must_use]
    pub fn new(
        date: DateTime<Utc>,
        risk_level: f64,
        price: f64,
        fair_value: f64,
        deviation: f64,
    ) -> Self {
        let date = start_of_day(&date);
        Self {
            date_string: day_key(&date),
            date,
            risk_level,
            price,
            fair_value,
            deviation,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RiskHistoryRecord {
    date: String,
    risk_level: f64,
    price: f64,
    fair_value: f64,
    deviation: f64,
}

impl From<RiskHistoryPoint> for RiskHistoryRecord {
    fn from(point: RiskHistoryPoint) -> Self {
        Self {
            date: point.date_string,
            risk_level: point.risk_level,
            price: point.price,
            fair_value: point.fair_value,
            deviation: point.deviation,
        }
    }
}

impl TryFrom<RiskHistoryRecord> for RiskHistoryPoint {
    type Error = String;

    fn try_from(record: RiskHistoryRecord) -> Result<Self, Self::Error> {
        let day = NaiveDate::parse_from_str(&record.date, DAY_KEY_FORMAT)
            .map_err(|e| format!("invalid day key {:?}: {e}", record.date))?;
        let date = day
            .and_hms_opt(0, 0, 0)
            .map(|dt| Utc.from_utc_datetime(&dt))
            .ok_or_else(|| format!("invalid day key {:?}", record.date))?;

        Ok(Self {
            date_string: record.date,
            date,
            risk_level: record.risk_level,
            price: record.price,
            fair_value: record.fair_value,
            deviation: record.deviation,
        })
    }
}
