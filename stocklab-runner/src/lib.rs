//! StockLab Runner — orchestration on top of `stocklab-core`.
//!
//! This crate provides:
//! - CSV bar loading with filtering, sorting and de-duplication
//! - TOML runner configuration
//! - Optimized parameter presets keyed by strategy, name and period type
//! - Ranking by a chosen statistic (`+∞` highest, NaN lowest)
//! - Parameter sweeps on a bounded worker pool
//! - Walk-forward validation with in-sample optimization
//! - BLAKE3 fingerprints of parameters and backtest output

pub mod config;
pub mod data_loader;
pub mod fingerprint;
pub mod presets;
pub mod ranking;
pub mod sweep;
pub mod walk_forward;

pub use config::{ConfigError, RunnerConfig};
pub use data_loader::{load_csv, load_dir, load_symbol, read_bars, LoadError, SymbolSeries};
pub use fingerprint::{bars_fingerprint, params_fingerprint, result_fingerprint};
pub use presets::{Preset, PresetError, PresetTable};
pub use ranking::{rank_by, RankingMetric};
pub use sweep::{run_sweep, SweepError, SweepOutcome, SweepPlan, SweepReport};
pub use walk_forward::{
    create_folds, run_walk_forward, DegradationFlag, FoldResult, FoldSpec, WalkForwardConfig,
    WalkForwardError, WalkForwardResult,
};

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{Duration, NaiveDate};
    use stocklab_core::domain::Bar;

    /// Oscillating uptrend: enough swings for crossover strategies to trade.
    pub fn trending_bars(n: usize) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let mut prev: f64 = 100.0;
        (0..n)
            .map(|i| {
                let t = i as f64;
                let close = 100.0 + 0.15 * t + 6.0 * (t / 9.0).sin();
                let open = prev;
                prev = close;
                Bar {
                    date: start + Duration::days(i as i64),
                    open,
                    high: open.max(close) + 1.0,
                    low: open.min(close) - 1.0,
                    close,
                    volume: 1_000_000,
                }
            })
            .collect()
    }
}
