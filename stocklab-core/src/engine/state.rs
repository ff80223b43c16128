//! Engine configuration, mutable state, and run result types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{EquityPoint, Trade, TradeSide};
use crate::stats::BacktestStats;
use crate::strategy::{ExecutionMode, StrategyError};

/// Capital settings for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Budget per buy in `FixedAmount` mode.
    pub fixed_amount: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000_000.0,
            fixed_amount: 100_000.0,
        }
    }
}

impl BacktestConfig {
    pub fn new(initial_capital: f64, fixed_amount: f64) -> Self {
        Self {
            initial_capital,
            fixed_amount,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, value) in [
            ("initial_capital", self.initial_capital),
            ("fixed_amount", self.fixed_amount),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidCapital { field, value });
            }
        }
        Ok(())
    }
}

/// Caller errors. Short or empty histories are not errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("signal count {signals} does not match bar count {bars}")]
    LengthMismatch { bars: usize, signals: usize },
    #[error("{field} must be finite and non-negative, got {value}")]
    InvalidCapital { field: &'static str, value: f64 },
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Mutable state that evolves bar-by-bar during the engine loop.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub cash: f64,
    pub shares: u64,
    /// Running max of equity, starting at initial capital.
    pub peak_equity: f64,
    /// Last finite, non-zero close; used to mark positions across void bars.
    pub last_valid_close: Option<f64>,
}

impl EngineState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            shares: 0,
            peak_equity: initial_capital,
            last_valid_close: None,
        }
    }

    pub fn is_long(&self) -> bool {
        self.shares > 0
    }

    /// Whole shares `budget` buys at `price`, never costing more than `budget`.
    pub fn affordable_shares(budget: f64, price: f64) -> u64 {
        if !(budget.is_finite() && price.is_finite()) || budget <= 0.0 || price <= 0.0 {
            return 0;
        }
        let mut shares = (budget / price).floor() as u64;
        while shares > 0 && shares as f64 * price > budget {
            shares -= 1;
        }
        shares
    }

    /// Buy `shares` at `price`. The caller has checked affordability.
    pub fn buy(
        &mut self,
        bar_index: usize,
        date: NaiveDate,
        price: f64,
        shares: u64,
        reason: &str,
    ) -> Trade {
        let value = shares as f64 * price;
        self.cash -= value;
        self.shares += shares;
        Trade {
            bar_index,
            date,
            side: TradeSide::Buy,
            price,
            shares,
            value,
            reason: reason.to_string(),
        }
    }

    /// Liquidate the whole position at `price`.
    pub fn sell_all(
        &mut self,
        bar_index: usize,
        date: NaiveDate,
        price: f64,
        reason: &str,
    ) -> Trade {
        let shares = std::mem::take(&mut self.shares);
        let value = shares as f64 * price;
        self.cash += value;
        Trade {
            bar_index,
            date,
            side: TradeSide::Sell,
            price,
            shares,
            value,
            reason: reason.to_string(),
        }
    }

    /// Mark to market at the last valid close and update the peak.
    pub fn mark(&mut self, date: NaiveDate) -> EquityPoint {
        let position = match self.last_valid_close {
            Some(close) => self.shares as f64 * close,
            None => 0.0,
        };
        let equity = self.cash + position;
        self.peak_equity = self.peak_equity.max(equity);
        let drawdown = if self.peak_equity > 0.0 {
            ((self.peak_equity - equity) / self.peak_equity).clamp(0.0, 1.0)
        } else {
            0.0
        };

        debug_assert!(
            (equity - (self.cash + position)).abs() < 1e-6,
            "equity accounting violated: equity={equity}, cash={} + position={position}",
            self.cash
        );

        EquityPoint {
            date,
            equity,
            cash: self.cash,
            position,
            drawdown,
        }
    }
}

/// Result of a complete backtest run. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub mode: ExecutionMode,
    pub trades: Vec<Trade>,
    /// One point per bar.
    pub equity: Vec<EquityPoint>,
    pub stats: BacktestStats,
    pub initial_capital: f64,
    /// Marked to the last close; open positions are not liquidated.
    pub final_equity: f64,
}

impl BacktestResult {
    /// Zero-valued result for an empty bar series.
    pub fn empty(mode: ExecutionMode, config: &BacktestConfig) -> Self {
        Self {
            mode,
            trades: Vec::new(),
            equity: Vec::new(),
            stats: BacktestStats::default(),
            initial_capital: config.initial_capital,
            final_equity: 0.0,
        }
    }

    pub fn total_return_pct(&self) -> f64 {
        self.stats.total_return_pct
    }

    pub fn is_open_at_end(&self) -> bool {
        self.equity.last().is_some_and(|p| p.position > 0.0)
    }
}
