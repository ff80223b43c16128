//! Backtest engine — replays a signal sequence bar by bar.
//!
//! Trades execute at the bar's close. The engine owns all capital policy:
//! strategies only say buy/sell/hold, the `ExecutionMode` decides how much.
//!
//! 1. Validate config and lengths
//! 2. For each bar: act on the signal (tradable bars only), mark to market
//! 3. Aggregate statistics from the trades and the equity curve

pub mod loop_runner;
pub mod state;

pub use loop_runner::{run_backtest, run_strategy};
pub use state::{BacktestConfig, BacktestResult, EngineError, EngineState};
