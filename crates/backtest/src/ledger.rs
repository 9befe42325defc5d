use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use risk_engine_core::parse_date;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl FromStr for TransactionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => bail!("unknown transaction kind {other:?}"),
        }
    }
}

/// One executed buy or sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: DateTime<Utc>,
    pub symbol: String,
    pub kind: TransactionKind,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Profit or loss booked by a sell, when the source recorded it
    pub realized_pnl: Option<Decimal>,
    /// Average cost of the units sold, used when `realized_pnl` is absent
    pub cost_basis_per_unit: Option<Decimal>,
}

impl Transaction {
    #[must_use]
    pub fn buy(date: DateTime<Utc>, symbol: &str, quantity: Decimal, price: Decimal) -> Self {
        Self {
            date,
            symbol: symbol.to_string(),
            kind: TransactionKind::Buy,
            quantity,
            price,
            realized_pnl: None,
            cost_basis_per_unit: None,
        }
    }

    #[must_use]
    pub fn sell(date: DateTime<Utc>, symbol: &str, quantity: Decimal, price: Decimal) -> Self {
        Self {
            kind: TransactionKind::Sell,
            ..Self::buy(date, symbol, quantity, price)
        }
    }

    #[must_use]
    pub fn with_realized_pnl(mut self, pnl: Decimal) -> Self {
        self.realized_pnl = Some(pnl);
        self
    }

    #[must_use]
    pub fn with_cost_basis(mut self, cost_per_unit: Decimal) -> Self {
        self.cost_basis_per_unit = Some(cost_per_unit);
        self
    }

    #[must_use]
    pub fn is_sell(&self) -> bool {
        self.kind == TransactionKind::Sell
    }

    /// Realized P&L of a sell: the recorded value, else `(price - cost) * quantity`.
    ///
    /// `None` for buys and for sells with neither value recorded.
    #[must_use]
    pub fn realized_profit(&self) -> Option<Decimal> {
        if !self.is_sell() {
            return None;
        }
        self.realized_pnl.or_else(|| {
            self.cost_basis_per_unit
                .map(|cost| (self.price - cost) * self.quantity)
        })
    }
}

/// Portfolio value at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueSnapshot {
    pub date: DateTime<Utc>,
    pub value: Decimal,
}

impl ValueSnapshot {
    #[must_use]
    pub fn new(date: DateTime<Utc>, value: Decimal) -> Self {
        Self { date, value }
    }
}

fn optional_decimal(field: Option<&str>) -> Result<Option<Decimal>> {
    match field.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Ok(Some(Decimal::from_str(value)?)),
    }
}

fn required<'r>(record: &'r csv::StringRecord, index: usize, name: &str) -> Result<&'r str> {
    record
        .get(index)
        .map(str::trim)
        .with_context(|| format!("missing {name} column"))
}

fn required_date(field: &str) -> Result<DateTime<Utc>> {
    parse_date(field).with_context(|| format!("invalid date {field:?}"))
}

fn required_decimal(field: &str) -> Result<Decimal> {
    Decimal::from_str(field).with_context(|| format!("invalid number {field:?}"))
}

/// Reads a transaction ledger from CSV, sorted by date.
///
/// Format: `date,symbol,kind,quantity,price[,realized_pnl[,cost_basis_per_unit]]`
/// with a header row. The optional columns may be empty.
///
/// # Errors
/// Returns an error if the file cannot be read or any row fails to parse.
pub fn read_transactions(path: impl AsRef<Path>) -> Result<Vec<Transaction>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open ledger: {}", path.display()))?;
    let mut transactions = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let row = || format!("ledger row {}", index + 1);

        transactions.push(Transaction {
            date: required(&record, 0, "date")
                .and_then(required_date)
                .with_context(row)?,
            symbol: required(&record, 1, "symbol").with_context(row)?.to_string(),
            kind: required(&record, 2, "kind")
                .and_then(str::parse)
                .with_context(row)?,
            quantity: required(&record, 3, "quantity")
                .and_then(required_decimal)
                .with_context(row)?,
            price: required(&record, 4, "price")
                .and_then(required_decimal)
                .with_context(row)?,
            realized_pnl: optional_decimal(record.get(5)).with_context(row)?,
            cost_basis_per_unit: optional_decimal(record.get(6)).with_context(row)?,
        });
    }

    transactions.sort_by_key(|t| t.date);
    Ok(transactions)
}

/// Reads a portfolio value history from CSV (`date,value`), sorted by date.
///
/// # Errors
/// Returns an error if the file cannot be read or any row fails to parse.
pub fn read_value_history(path: impl AsRef<Path>) -> Result<Vec<ValueSnapshot>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open value history: {}", path.display()))?;
    let mut history = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let row = || format!("value history row {}", index + 1);

        history.push(ValueSnapshot {
            date: required(&record, 0, "date")
                .and_then(required_date)
                .with_context(row)?,
            value: required(&record, 1, "value")
                .and_then(required_decimal)
                .with_context(row)?,
        });
    }

    history.sort_by_key(|s| s.date);
    Ok(history)
}
