//! Strategy registry — parameterized, pure signal-generating rules.
//!
//! A strategy turns a bar series plus resolved parameters into one `Signal`
//! per bar. Strategies never see capital or portfolio state; the execution
//! mode tag tells the engine which capital policy applies.
//!
//! # No-lookahead contract
//! The signal at index i may depend only on `bars[0..=i]`. Computing on a
//! prefix of a series must reproduce the same prefix of signals.

pub mod bollinger_reversion;
pub mod buy_and_hold;
pub mod dip_buy;
pub mod ma_cross;
pub mod macd_cross;
pub mod params;
pub mod periodic_accumulation;
pub mod registry;
pub mod rsi_reversal;

pub use bollinger_reversion::BollingerReversion;
pub use buy_and_hold::BuyAndHold;
pub use dip_buy::DipBuy;
pub use ma_cross::MaCross;
pub use macd_cross::MacdCross;
pub use params::{
    default_params, grid_size, param_grid, resolve_params, ParamSchema, ParamSpec,
    ResolvedParams, StrategyParams,
};
pub use periodic_accumulation::PeriodicAccumulation;
pub use registry::StrategyRegistry;
pub use rsi_reversal::RsiReversal;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, Signal};

/// Capital policy the engine applies to a strategy's signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Commit all cash on a buy, liquidate everything on a sell.
    AllInOut,
    /// Buy a fixed amount per buy signal; never sell.
    FixedAmount,
}

/// Malformed strategy lookups or parameters. These are programmer errors,
/// not data conditions: short histories produce all-hold signals instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StrategyError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("{strategy}: unknown parameter '{key}'")]
    UnknownParam { strategy: String, key: String },
    #[error("{strategy}: parameter '{key}' = {value} outside [{min}, {max}]")]
    OutOfRange {
        strategy: String,
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{strategy}: {reason}")]
    InvalidCombination { strategy: String, reason: String },
}

/// A parameterized signal rule.
pub trait Strategy: Send + Sync {
    /// Stable identifier (e.g., "ma_cross").
    fn id(&self) -> &'static str;

    /// Display name.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn param_schema(&self) -> &'static [ParamSpec];

    fn execution_mode(&self) -> ExecutionMode;

    /// Minimum series length for which `evaluate` can emit anything.
    fn required_bars(&self, params: &ResolvedParams) -> usize;

    /// Produce one signal per bar. Only called with at least
    /// `required_bars(params)` bars; must return `bars.len()` signals.
    fn evaluate(&self, bars: &[Bar], params: &ResolvedParams) -> Vec<Signal>;

    /// Cross-parameter constraints the schema ranges cannot express.
    fn validate(&self, _params: &ResolvedParams) -> Result<(), StrategyError> {
        Ok(())
    }

    fn schema(&self) -> ParamSchema<'static> {
        ParamSchema::new(self.id(), self.param_schema())
    }

    /// Resolve caller parameters against the schema, then validate.
    fn resolve(&self, params: &StrategyParams) -> Result<ResolvedParams, StrategyError> {
        let resolved = self.schema().resolve(params)?;
        self.validate(&resolved)?;
        Ok(resolved)
    }

    /// The signal sequence for `bars`.
    ///
    /// A series shorter than `required_bars` yields all-hold signals.
    fn compute(&self, bars: &[Bar], params: &ResolvedParams) -> Vec<Signal> {
        if bars.len() < self.required_bars(params) {
            return Signal::all_hold(bars.len());
        }
        let signals = self.evaluate(bars, params);
        debug_assert_eq!(signals.len(), bars.len(), "{}: signal length", self.id());
        signals
    }

    /// Serializable description for UIs and the CLI.
    fn info(&self) -> StrategyInfo {
        StrategyInfo {
            id: self.id(),
            name: self.name(),
            description: self.description(),
            execution_mode: self.execution_mode(),
            params: self.param_schema().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub execution_mode: ExecutionMode,
    pub params: Vec<ParamSpec>,
}

/// `a` crossed from at-or-below `b` to strictly above it between two bars.
pub(crate) fn crossed_above(a_prev: f64, b_prev: f64, a: f64, b: f64) -> bool {
    defined(&[a_prev, b_prev, a, b]) && a_prev <= b_prev && a > b
}

/// `a` crossed from at-or-above `b` to strictly below it between two bars.
pub(crate) fn crossed_below(a_prev: f64, b_prev: f64, a: f64, b: f64) -> bool {
    defined(&[a_prev, b_prev, a, b]) && a_prev >= b_prev && a < b
}

fn defined(values: &[f64]) -> bool {
    values.iter().all(|v| !v.is_nan())
}

/// Synthetic daily bars from closes, shared by strategy unit tests.
#[cfg(test)]
pub(crate) fn test_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar {
            date: base + chrono::Duration::days(i as i64),
            open: c,
            high: c + 0.5,
            low: c - 0.5,
            close: c,
            volume: 1_000,
        })
        .collect()
}
