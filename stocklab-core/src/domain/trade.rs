//! Trade — one engine fill — and RoundTrip, one buy matched to its sell.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A single execution recorded by the engine.
///
/// Trades are derived from signal state transitions, never authored directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub side: TradeSide,
    pub price: f64,
    pub shares: u64,
    /// `price * shares`.
    pub value: f64,
    pub reason: String,
}

impl Trade {
    pub fn is_buy(&self) -> bool {
        self.side == TradeSide::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.side == TradeSide::Sell
    }
}

/// A completed buy-then-sell position lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: u64,
    /// Exit value minus entry value.
    pub profit: f64,
    /// Profit as a percentage of entry value.
    pub return_pct: f64,
    /// Calendar days between entry and exit (not trading days).
    pub holding_days: i64,
}

impl RoundTrip {
    /// Pair an entry trade with its exit trade.
    pub fn from_pair(entry: &Trade, exit: &Trade) -> Self {
        let profit = exit.value - entry.value;
        let return_pct = if entry.value > 0.0 {
            profit / entry.value * 100.0
        } else {
            0.0
        };
        Self {
            entry_date: entry.date,
            exit_date: exit.date,
            entry_price: entry.price,
            exit_price: exit.price,
            shares: entry.shares,
            profit,
            return_pct,
            holding_days: (exit.date - entry.date).num_days(),
        }
    }

    pub fn is_winner(&self) -> bool {
        self.profit > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.profit < 0.0
    }
}
