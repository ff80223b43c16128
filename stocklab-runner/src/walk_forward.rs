//! Walk-forward validation — in-sample optimization, out-of-sample evaluation.
//!
//! Splits a series into expanding in-sample (IS) windows, each followed by a
//! fixed-size out-of-sample (OOS) window. For every fold the whole parameter
//! plan is backtested on the IS window (in parallel), the best combination by
//! the ranking metric is kept, and that combination alone is evaluated on the
//! OOS window. The degradation ratio (mean OOS score / mean IS score) flags
//! overfitting.
//!
//! OOS signals are computed over `bars[..oos_end]` and then sliced, so
//! indicators are warm at the first OOS bar and no OOS signal sees a bar past
//! its own.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use stocklab_core::engine::{run_backtest, run_strategy, BacktestResult, EngineError};
use stocklab_core::strategy::{StrategyError, StrategyParams, StrategyRegistry};

use crate::config::{ConfigError, RunnerConfig};
use crate::data_loader::SymbolSeries;
use crate::ranking::{best_index, RankingMetric};
use crate::sweep::{build_pool, SweepPlan};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Number of folds (default 5).
    pub n_folds: usize,
    /// Minimum total bars required (default 756, three years of daily bars).
    pub min_total_bars: usize,
    /// Minimum in-sample bars in the first fold (default 252).
    pub min_is_bars: usize,
    /// Minimum out-of-sample bars per fold (default 63, one quarter).
    pub min_oos_bars: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            min_total_bars: 756,
            min_is_bars: 252,
            min_oos_bars: 63,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Bar index ranges of one fold. Ends are exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    pub is_start: usize,
    pub is_end: usize,
    pub oos_start: usize,
    pub oos_end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold_index: usize,
    pub best_params: StrategyParams,
    /// Oriented ranking score of the best combination in sample.
    pub is_score: f64,
    pub oos_score: f64,
    pub is_trades: usize,
    pub oos_trades: usize,
    pub oos_return_pct: f64,
}

/// How the degradation ratio was computed (or why it wasn't).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationFlag {
    /// IS score >= 0.1, ratio computed normally.
    Normal,
    /// IS score in [0, 0.1): difference (OOS - IS) reported instead.
    LowInSample,
    /// IS score negative, ratio skipped.
    NegativeInSample,
    /// IS score >= 0.1 but OOS negative: clamped to 0.0.
    FailedOos,
    /// A mean score is infinite or NaN (e.g., profit factor with no losses).
    NonFinite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub symbol: String,
    pub strategy_id: String,
    pub metric: RankingMetric,
    pub combinations: usize,
    pub folds: Vec<FoldResult>,
    pub mean_is_score: f64,
    pub mean_oos_score: f64,
    pub degradation_ratio: Option<f64>,
    pub degradation_flag: DegradationFlag,
}

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("insufficient data: {total_bars} bars < minimum {min_bars}")]
    InsufficientData { total_bars: usize, min_bars: usize },
    #[error("fold creation failed: cannot fit {n_folds} folds in {total_bars} bars")]
    FoldCreationFailed { n_folds: usize, total_bars: usize },
    #[error("no parameter combinations for {0}")]
    EmptyPlan(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("backtest error on fold {fold}: {source}")]
    BacktestFailed {
        fold: usize,
        #[source]
        source: EngineError,
    },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

// ─── Fold creation ───────────────────────────────────────────────────

/// Create expanding-window fold specifications.
///
/// - Fold 0: IS = [0, min_is), OOS = [min_is, min_is + oos_size)
/// - Fold i: IS = [0, min_is + i·oos_size), OOS = the next oos_size bars
///
/// where `oos_size = (total_bars - min_is_bars) / n_folds`.
pub fn create_folds(
    total_bars: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<FoldSpec>, WalkForwardError> {
    if total_bars < config.min_total_bars {
        return Err(WalkForwardError::InsufficientData {
            total_bars,
            min_bars: config.min_total_bars,
        });
    }

    let n = config.n_folds;
    let fold_error = WalkForwardError::FoldCreationFailed {
        n_folds: n,
        total_bars,
    };
    if n == 0 {
        return Err(fold_error);
    }

    let oos_size = total_bars.saturating_sub(config.min_is_bars) / n;
    if oos_size == 0 || oos_size < config.min_oos_bars {
        return Err(fold_error);
    }

    let folds: Vec<FoldSpec> = (0..n)
        .map(|i| {
            let is_end = config.min_is_bars + i * oos_size;
            FoldSpec {
                fold_index: i,
                is_start: 0,
                is_end,
                oos_start: is_end,
                oos_end: is_end + oos_size,
            }
        })
        .take_while(|fold| fold.oos_end <= total_bars)
        .collect();

    if folds.is_empty() {
        return Err(fold_error);
    }
    Ok(folds)
}

// ─── Orchestration ───────────────────────────────────────────────────

/// Walk-forward validate `plan` on one series.
pub fn run_walk_forward(
    registry: &StrategyRegistry,
    plan: &SweepPlan,
    series: &SymbolSeries,
    wf_config: &WalkForwardConfig,
    config: &RunnerConfig,
) -> Result<WalkForwardResult, WalkForwardError> {
    config.validate()?;
    if plan.is_empty() {
        return Err(WalkForwardError::EmptyPlan(plan.strategy_id.clone()));
    }
    let strategy = registry.get(&plan.strategy_id)?;
    for combo in &plan.combos {
        strategy.resolve(combo)?;
    }

    let bars = &series.bars;
    let folds = create_folds(bars.len(), wf_config)?;
    let metric = config.ranking_metric;
    let backtest_config = config.backtest_config();
    let pool = build_pool(config.workers)?;

    info!(
        symbol = %series.symbol,
        strategy = %plan.strategy_id,
        folds = folds.len(),
        combinations = plan.len(),
        "starting walk-forward"
    );

    let mut fold_results = Vec::with_capacity(folds.len());
    for fold in &folds {
        let backtest_failed = |source| WalkForwardError::BacktestFailed {
            fold: fold.fold_index,
            source,
        };

        let is_bars = &bars[fold.is_start..fold.is_end];
        let is_results: Vec<BacktestResult> = pool
            .install(|| {
                plan.combos
                    .par_iter()
                    .map(|params| {
                        run_strategy(
                            registry,
                            &plan.strategy_id,
                            is_bars,
                            params,
                            &backtest_config,
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(backtest_failed)?;

        // Non-empty plan, so a best combination always exists.
        let Some(best) = best_index(&is_results, metric, |r| &r.stats) else {
            return Err(WalkForwardError::EmptyPlan(plan.strategy_id.clone()));
        };
        let best_params = &plan.combos[best];
        let is_result = &is_results[best];

        let signals = registry.compute(&plan.strategy_id, &bars[..fold.oos_end], best_params)?;
        let oos_result = run_backtest(
            &bars[fold.oos_start..fold.oos_end],
            &signals[fold.oos_start..],
            strategy.execution_mode(),
            &backtest_config,
        )
        .map_err(backtest_failed)?;

        let result = FoldResult {
            fold_index: fold.fold_index,
            best_params: best_params.clone(),
            is_score: metric.score(&is_result.stats),
            oos_score: metric.score(&oos_result.stats),
            is_trades: is_result.stats.trade_count,
            oos_trades: oos_result.stats.trade_count,
            oos_return_pct: oos_result.stats.total_return_pct,
        };
        debug!(
            fold = result.fold_index,
            is_score = result.is_score,
            oos_score = result.oos_score,
            "walk-forward fold done"
        );
        fold_results.push(result);
    }

    let result = summarize(series, plan, metric, fold_results);
    info!(
        symbol = %result.symbol,
        mean_is = result.mean_is_score,
        mean_oos = result.mean_oos_score,
        flag = ?result.degradation_flag,
        "walk-forward finished"
    );
    Ok(result)
}

fn summarize(
    series: &SymbolSeries,
    plan: &SweepPlan,
    metric: RankingMetric,
    folds: Vec<FoldResult>,
) -> WalkForwardResult {
    let n = folds.len().max(1) as f64;
    let mean_is_score = folds.iter().map(|f| f.is_score).sum::<f64>() / n;
    let mean_oos_score = folds.iter().map(|f| f.oos_score).sum::<f64>() / n;
    let (degradation_ratio, degradation_flag) =
        compute_degradation_ratio(mean_is_score, mean_oos_score);

    WalkForwardResult {
        symbol: series.symbol.clone(),
        strategy_id: plan.strategy_id.clone(),
        metric,
        combinations: plan.len(),
        folds,
        mean_is_score,
        mean_oos_score,
        degradation_ratio,
        degradation_flag,
    }
}

/// Degradation ratio with edge cases:
///
/// - either mean non-finite: skipped (NonFinite)
/// - IS < 0: skipped (NegativeInSample)
/// - 0 <= IS < 0.1: difference OOS - IS (LowInSample)
/// - IS >= 0.1 and OOS < 0: clamped to 0.0 (FailedOos)
/// - otherwise OOS / IS (Normal)
pub fn compute_degradation_ratio(
    mean_is_score: f64,
    mean_oos_score: f64,
) -> (Option<f64>, DegradationFlag) {
    if !mean_is_score.is_finite() || !mean_oos_score.is_finite() {
        (None, DegradationFlag::NonFinite)
    } else if mean_is_score < 0.0 {
        (None, DegradationFlag::NegativeInSample)
    } else if mean_is_score < 0.1 {
        (Some(mean_oos_score - mean_is_score), DegradationFlag::LowInSample)
    } else if mean_oos_score < 0.0 {
        (Some(0.0), DegradationFlag::FailedOos)
    } else {
        (Some(mean_oos_score / mean_is_score), DegradationFlag::Normal)
    }
}
