//! BLAKE3 fingerprints of parameters, bar series and backtest output.
//!
//! Floats are hashed by bit pattern, so two results share a fingerprint only
//! if every number is bit-identical. This is what the idempotence checks
//! compare.

use stocklab_core::domain::{Bar, TradeSide};
use stocklab_core::engine::BacktestResult;
use stocklab_core::strategy::StrategyParams;

/// Hex digest of a parameter map. `StrategyParams` is a `BTreeMap`, so key
/// order is canonical.
pub fn params_fingerprint(params: &StrategyParams) -> String {
    let mut hasher = blake3::Hasher::new();
    for (key, value) in params {
        hasher.update(key.as_bytes());
        hasher.update(&[0]);
        hasher.update(&value.to_bits().to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Hex digest of a bar series.
pub fn bars_fingerprint(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        for value in [bar.open, bar.high, bar.low, bar.close] {
            hasher.update(&value.to_bits().to_le_bytes());
        }
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Hex digest of everything numeric a backtest produces: trades, the equity
/// curve, and the final equity.
pub fn result_fingerprint(result: &BacktestResult) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(result.trades.len() as u64).to_le_bytes());
    for trade in &result.trades {
        hasher.update(&(trade.bar_index as u64).to_le_bytes());
        hasher.update(&[match trade.side {
            TradeSide::Buy => 1,
            TradeSide::Sell => 2,
        }]);
        hasher.update(&trade.shares.to_le_bytes());
        hasher.update(&trade.price.to_bits().to_le_bytes());
        hasher.update(&trade.value.to_bits().to_le_bytes());
    }
    hasher.update(&(result.equity.len() as u64).to_le_bytes());
    for point in &result.equity {
        for value in [point.equity, point.cash, point.position, point.drawdown] {
            hasher.update(&value.to_bits().to_le_bytes());
        }
    }
    hasher.update(&result.final_equity.to_bits().to_le_bytes());
    hasher.finalize().to_hex().to_string()
}
