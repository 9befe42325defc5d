//! Trade-level performance analytics.
//!
//! Everything here is a pure function of a transaction ledger and a
//! portfolio value history. Money stays in `Decimal`; ratios and rates are
//! `f64`.

use chrono::Duration;
use risk_engine_core::{mean, standard_deviation};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::ledger::{Transaction, TransactionKind, ValueSnapshot};

/// Days per year used to annualize daily returns.
pub const TRADING_DAYS_PER_YEAR: f64 = 365.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Sells with a known realized P&L
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Winning trades / total trades, in `[0, 1]`
    pub win_rate: f64,
    pub average_win: Decimal,
    /// Mean losing trade as a positive magnitude
    pub average_loss: Decimal,
    /// Average win / average loss; 0 without losses
    pub profit_factor: f64,
    pub largest_win: Decimal,
    /// Largest losing trade as a positive magnitude
    pub largest_loss: Decimal,
    pub total_realized_pnl: Decimal,
    /// Last value over first value, in percent
    pub total_return: Decimal,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough fall, in percent of the peak
    pub max_drawdown: Decimal,
    /// Absolute size of that fall
    pub max_drawdown_value: Decimal,
    pub average_holding_days: f64,
    /// Buy lots matched against sells
    pub holding_pairs: usize,
}

impl PerformanceMetrics {
    /// Poor, Fair, Good, Very Good or Excellent.
    #[must_use]
    pub fn sharpe_rating(&self) -> &'static str {
        match self.sharpe_ratio {
            s if s < 0.0 => "Poor",
            s if s < 1.0 => "Fair",
            s if s < 2.0 => "Good",
            s if s < 3.0 => "Very Good",
            _ => "Excellent",
        }
    }

    #[must_use]
    pub fn holding_period_description(&self) -> &'static str {
        if self.holding_pairs == 0 {
            "N/A"
        } else if self.average_holding_days < 1.0 {
            "Day Trading"
        } else if self.average_holding_days < 30.0 {
            "Swing Trading"
        } else {
            "Long-term Holding"
        }
    }

    /// `"1:X.X"` reward per unit of risk, or `"N/A"` without losses.
    #[must_use]
    pub fn risk_reward_ratio(&self) -> String {
        if self.average_loss.is_zero() {
            return "N/A".to_string();
        }
        let ratio = (self.average_win / self.average_loss).to_f64().unwrap_or(0.0);
        format!("1:{ratio:.1}")
    }
}

pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Computes every metric from a ledger and a value history.
    ///
    /// Every sell is a trade. A sell with neither a recorded P&L nor a cost
    /// basis counts as a zero-P&L trade: it widens the win-rate denominator
    /// but is neither a win nor a loss. Neither input needs to be sorted.
    #[must_use]
    pub fn calculate(
        transactions: &[Transaction],
        history: &[ValueSnapshot],
    ) -> PerformanceMetrics {
        let profits: Vec<Decimal> = transactions
            .iter()
            .filter(|t| t.is_sell())
            .map(|t| t.realized_profit().unwrap_or(Decimal::ZERO))
            .collect();
        let wins: Vec<Decimal> = profits.iter().copied().filter(|p| *p > Decimal::ZERO).collect();
        let losses: Vec<Decimal> = profits
            .iter()
            .copied()
            .filter(|p| *p < Decimal::ZERO)
            .map(|p| -p)
            .collect();

        let total_trades = profits.len();
        let win_rate = if total_trades == 0 {
            0.0
        } else {
            wins.len() as f64 / total_trades as f64
        };

        let average_win = decimal_mean(&wins);
        let average_loss = decimal_mean(&losses);
        let profit_factor = if average_loss.is_zero() {
            0.0
        } else {
            (average_win / average_loss).to_f64().unwrap_or(0.0)
        };

        let sorted = sorted_history(history);
        let (max_drawdown, max_drawdown_value) = Self::max_drawdown(&sorted);
        let (average_holding_days, holding_pairs) = Self::average_holding_days(transactions);

        PerformanceMetrics {
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate,
            average_win,
            average_loss,
            profit_factor,
            largest_win: wins.iter().copied().max().unwrap_or(Decimal::ZERO),
            largest_loss: losses.iter().copied().max().unwrap_or(Decimal::ZERO),
            total_realized_pnl: profits.iter().copied().sum(),
            total_return: Self::total_return(&sorted),
            sharpe_ratio: Self::sharpe_ratio(&sorted),
            max_drawdown,
            max_drawdown_value,
            average_holding_days,
            holding_pairs,
        }
    }

    /// Largest fall from a running peak as `(percent, value)`.
    ///
    /// Expects the history in date order. Zero for fewer than two points.
    #[must_use]
    pub fn max_drawdown(history: &[ValueSnapshot]) -> (Decimal, Decimal) {
        let mut max_pct = Decimal::ZERO;
        let mut max_value = Decimal::ZERO;
        let Some(first) = history.first() else {
            return (max_pct, max_value);
        };

        let mut peak = first.value;
        for snapshot in &history[1..] {
            if snapshot.value > peak {
                peak = snapshot.value;
                continue;
            }
            if peak <= Decimal::ZERO {
                continue;
            }
            let fall = peak - snapshot.value;
            let pct = fall / peak * Decimal::ONE_HUNDRED;
            if pct > max_pct {
                max_pct = pct;
                max_value = fall;
            }
        }
        (max_pct, max_value)
    }

    /// Annualized Sharpe ratio of daily returns, zero risk-free rate.
    ///
    /// Expects the history in date order. Returns 0 with fewer than two
    /// returns or zero volatility.
    #[must_use]
    pub fn sharpe_ratio(history: &[ValueSnapshot]) -> f64 {
        let returns: Vec<f64> = history
            .windows(2)
            .filter(|w| w[0].value > Decimal::ZERO)
            .filter_map(|w| ((w[1].value - w[0].value) / w[0].value).to_f64())
            .collect();

        if returns.len() < 2 {
            return 0.0;
        }
        let volatility = standard_deviation(&returns);
        if !(volatility > 0.0) {
            return 0.0;
        }
        mean(&returns) / volatility * TRADING_DAYS_PER_YEAR.sqrt()
    }

    /// Last value over first value, in percent. Expects date order.
    #[must_use]
    pub fn total_return(history: &[ValueSnapshot]) -> Decimal {
        match (history.first(), history.last()) {
            (Some(first), Some(last)) if history.len() > 1 && first.value > Decimal::ZERO => {
                (last.value - first.value) / first.value * Decimal::ONE_HUNDRED
            }
            _ => Decimal::ZERO,
        }
    }

    /// Mean days between FIFO-matched buys and sells of the same symbol.
    ///
    /// Each buy lot consumed, fully or in part, by a sell counts as one pair.
    /// Returns `(average_days, pairs)`, or `(0.0, 0)` when nothing matches.
    #[must_use]
    pub fn average_holding_days(transactions: &[Transaction]) -> (f64, usize) {
        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by_key(|t| t.date);

        let mut open_lots: HashMap<&str, VecDeque<(chrono::DateTime<chrono::Utc>, Decimal)>> =
            HashMap::new();
        let mut held: Vec<Duration> = Vec::new();

        for tx in ordered {
            let lots = open_lots.entry(tx.symbol.as_str()).or_default();
            match tx.kind {
                TransactionKind::Buy => lots.push_back((tx.date, tx.quantity)),
                TransactionKind::Sell => {
                    let mut remaining = tx.quantity;
                    while remaining > Decimal::ZERO {
                        let Some(lot) = lots.front_mut() else {
                            break;
                        };
                        held.push(tx.date - lot.0);
                        if lot.1 > remaining {
                            lot.1 -= remaining;
                            remaining = Decimal::ZERO;
                        } else {
                            remaining -= lot.1;
                            lots.pop_front();
                        }
                    }
                }
            }
        }

        if held.is_empty() {
            return (0.0, 0);
        }
        let total_days: f64 = held
            .iter()
            .map(|d| d.num_seconds() as f64 / SECONDS_PER_DAY)
            .sum();
        (total_days / held.len() as f64, held.len())
    }
}

fn decimal_mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len())
}

fn sorted_history(history: &[ValueSnapshot]) -> Vec<ValueSnapshot> {
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|s| s.date);
    sorted
}
