//! StockLab Core — deterministic backtesting and price-pattern detection.
//!
//! This crate contains the computational core:
//! - Domain types (bars, signals, trades, round trips, equity points)
//! - Indicator library (SMA, EMA, RSI, Bollinger, MACD)
//! - Strategy registry with parameter schemas
//! - Backtest engine with all-in-out and fixed-amount execution
//! - Statistics aggregator
//! - Active-position / recent-signal scanner
//! - Cup-with-handle and gap-down reversal detectors
//!
//! No I/O, no threads, no global state: every entry point is a pure function
//! of its inputs.

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod patterns;
pub mod scanner;
pub mod stats;
pub mod strategy;
