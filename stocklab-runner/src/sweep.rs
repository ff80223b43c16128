//! Parameter sweeps — every (symbol × parameter combination) backtest.
//!
//! Tasks run on a dedicated rayon pool of `RunnerConfig::workers` threads and
//! report through an mpsc channel. The collected outcomes are sorted by
//! (symbol, parameter fingerprint) before returning, so output order never
//! depends on scheduling.
//!
//! Grids larger than `max_combinations` are subsampled with a seeded RNG
//! directly in index space, so huge grids are never materialized.

use std::sync::mpsc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use stocklab_core::engine::{run_strategy, EngineError};
use stocklab_core::stats::BacktestStats;
use stocklab_core::strategy::{
    ParamSpec, Strategy, StrategyError, StrategyParams, StrategyRegistry,
};

use crate::config::{ConfigError, RunnerConfig};
use crate::data_loader::SymbolSeries;
use crate::fingerprint::{params_fingerprint, result_fingerprint};
use crate::ranking::{rank_by, RankingMetric};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("backtest failed for {symbol}: {source}")]
    Engine {
        symbol: String,
        #[source]
        source: EngineError,
    },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("sweep has no symbols")]
    NoSymbols,
    #[error("no valid parameter combinations for {0}")]
    EmptyPlan(String),
}

// ─── Plan ────────────────────────────────────────────────────────────

/// The parameter combinations a sweep evaluates for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    pub strategy_id: String,
    /// Size of the full grid before filtering and sampling.
    pub grid_size: usize,
    pub combos: Vec<StrategyParams>,
}

impl SweepPlan {
    /// A plan over explicit combinations.
    pub fn from_combos(strategy_id: impl Into<String>, combos: Vec<StrategyParams>) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            grid_size: combos.len(),
            combos,
        }
    }

    /// The full grid, minus combinations the strategy rejects.
    pub fn grid(registry: &StrategyRegistry, strategy_id: &str) -> Result<Self, SweepError> {
        let strategy = registry.get(strategy_id)?;
        let schema = strategy.schema();
        let combos = valid_only(strategy, schema.grid());
        Ok(Self {
            strategy_id: strategy_id.to_string(),
            grid_size: schema.grid_size(),
            combos,
        })
    }

    /// The full grid, or a seeded random subset of `config.max_combinations`
    /// grid points when the grid is larger.
    pub fn for_config(
        registry: &StrategyRegistry,
        strategy_id: &str,
        config: &RunnerConfig,
    ) -> Result<Self, SweepError> {
        let strategy = registry.get(strategy_id)?;
        let specs = strategy.param_schema();
        let total = strategy.schema().grid_size();
        if total <= config.max_combinations {
            return Self::grid(registry, strategy_id);
        }

        let values: Vec<Vec<f64>> = specs.iter().map(ParamSpec::grid_values).collect();
        let indices = sample_indices(total, config.max_combinations, config.seed);
        let combos = indices
            .into_iter()
            .map(|index| combination_at(specs, &values, index))
            .collect();
        let combos = valid_only(strategy, combos);
        info!(
            strategy = strategy_id,
            grid = total,
            sampled = combos.len(),
            "subsampled parameter grid"
        );
        Ok(Self {
            strategy_id: strategy_id.to_string(),
            grid_size: total,
            combos,
        })
    }

    /// Keep a seeded random subset of `n` combinations, in their original order.
    pub fn sample(mut self, n: usize, seed: u64) -> Self {
        if self.combos.len() > n {
            let indices = sample_indices(self.combos.len(), n, seed);
            let mut keep = indices.into_iter().peekable();
            let mut i = 0;
            self.combos.retain(|_| {
                let kept = keep.peek() == Some(&i);
                if kept {
                    keep.next();
                }
                i += 1;
                kept
            });
        }
        self
    }

    pub fn len(&self) -> usize {
        self.combos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combos.is_empty()
    }
}

/// `n` distinct indices below `total`, ascending.
fn sample_indices(total: usize, n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, total, n.min(total)).into_vec();
    indices.sort_unstable();
    indices
}

/// Decode a grid index: schema order, last key varying fastest.
fn combination_at(specs: &[ParamSpec], values: &[Vec<f64>], mut index: usize) -> StrategyParams {
    let mut combo = StrategyParams::new();
    for (spec, vals) in specs.iter().zip(values).rev() {
        let n = vals.len().max(1);
        if let Some(&v) = vals.get(index % n) {
            combo.insert(spec.key.to_string(), v);
        }
        index /= n;
    }
    combo
}

fn valid_only(strategy: &dyn Strategy, combos: Vec<StrategyParams>) -> Vec<StrategyParams> {
    let before = combos.len();
    let combos: Vec<StrategyParams> = combos
        .into_iter()
        .filter(|c| strategy.resolve(c).is_ok())
        .collect();
    if combos.len() < before {
        debug!(
            strategy = strategy.id(),
            skipped = before - combos.len(),
            "skipped invalid parameter combinations"
        );
    }
    combos
}

// ─── Outcomes ────────────────────────────────────────────────────────

/// One (symbol, parameters) backtest, summarized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub symbol: String,
    pub params: StrategyParams,
    pub params_fingerprint: String,
    pub result_fingerprint: String,
    pub final_equity: f64,
    pub stats: BacktestStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub strategy_id: String,
    pub metric: RankingMetric,
    pub grid_size: usize,
    pub combinations: usize,
    pub symbols: usize,
    /// Sorted by (symbol, params fingerprint).
    pub outcomes: Vec<SweepOutcome>,
}

impl SweepReport {
    /// Outcomes best-first by the report's metric.
    pub fn ranked(&self) -> Vec<&SweepOutcome> {
        let mut ranked: Vec<&SweepOutcome> = self.outcomes.iter().collect();
        rank_by(&mut ranked, self.metric, |o| &o.stats);
        ranked
    }

    pub fn best(&self) -> Option<&SweepOutcome> {
        self.ranked().into_iter().next()
    }

    /// Best outcome for each symbol, in symbol order.
    pub fn best_per_symbol(&self) -> Vec<&SweepOutcome> {
        let mut best: Vec<&SweepOutcome> = Vec::new();
        for outcome in self.ranked() {
            if !best.iter().any(|b| b.symbol == outcome.symbol) {
                best.push(outcome);
            }
        }
        best.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        best
    }
}

// ─── Execution ───────────────────────────────────────────────────────

pub(crate) fn build_pool(
    workers: usize,
) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("stocklab-worker-{i}"))
        .build()
}

/// Backtest every combination of `plan` on every series.
pub fn run_sweep(
    registry: &StrategyRegistry,
    plan: &SweepPlan,
    symbols: &[SymbolSeries],
    config: &RunnerConfig,
) -> Result<SweepReport, SweepError> {
    config.validate()?;
    if symbols.is_empty() {
        return Err(SweepError::NoSymbols);
    }
    if plan.is_empty() {
        return Err(SweepError::EmptyPlan(plan.strategy_id.clone()));
    }

    // Reject malformed parameters before any work is scheduled.
    let strategy = registry.get(&plan.strategy_id)?;
    for combo in &plan.combos {
        strategy.resolve(combo)?;
    }
    let keyed: Vec<(String, &StrategyParams)> = plan
        .combos
        .iter()
        .map(|c| (params_fingerprint(c), c))
        .collect();

    let backtest_config = config.backtest_config();
    let pool = build_pool(config.workers)?;
    let total = symbols.len() * keyed.len();
    info!(
        strategy = %plan.strategy_id,
        symbols = symbols.len(),
        combinations = keyed.len(),
        tasks = total,
        workers = config.workers,
        "starting sweep"
    );

    let (tx, rx) = mpsc::channel::<Result<SweepOutcome, SweepError>>();
    pool.scope(|scope| {
        for series in symbols {
            for (fingerprint, params) in &keyed {
                let tx = tx.clone();
                let backtest_config = &backtest_config;
                scope.spawn(move |_| {
                    let outcome = run_strategy(
                        registry,
                        &plan.strategy_id,
                        &series.bars,
                        params,
                        backtest_config,
                    )
                    .map(|result| SweepOutcome {
                        symbol: series.symbol.clone(),
                        params: (*params).clone(),
                        params_fingerprint: fingerprint.clone(),
                        result_fingerprint: result_fingerprint(&result),
                        final_equity: result.final_equity,
                        stats: result.stats,
                    })
                    .map_err(|source| SweepError::Engine {
                        symbol: series.symbol.clone(),
                        source,
                    });
                    if let Ok(outcome) = &outcome {
                        debug!(
                            symbol = %outcome.symbol,
                            params = %outcome.params_fingerprint,
                            total_return_pct = outcome.stats.total_return_pct,
                            "sweep task done"
                        );
                    }
                    // The receiver outlives the scope, so send cannot fail.
                    let _ = tx.send(outcome);
                });
            }
        }
    });
    drop(tx);

    let mut outcomes = Vec::with_capacity(total);
    for message in rx {
        outcomes.push(message?);
    }
    outcomes.sort_by(|a, b| {
        a.symbol
            .cmp(&b.symbol)
            .then_with(|| a.params_fingerprint.cmp(&b.params_fingerprint))
    });

    info!(strategy = %plan.strategy_id, outcomes = outcomes.len(), "sweep finished");
    Ok(SweepReport {
        strategy_id: plan.strategy_id.clone(),
        metric: config.ranking_metric,
        grid_size: plan.grid_size,
        combinations: keyed.len(),
        symbols: symbols.len(),
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocklab_core::domain::PeriodType;

    use crate::testing::trending_bars;

    fn config(workers: usize) -> RunnerConfig {
        RunnerConfig {
            workers,
            ..RunnerConfig::default()
        }
    }

    fn series(symbol: &str, n: usize) -> SymbolSeries {
        SymbolSeries::new(symbol, PeriodType::Daily, trending_bars(n))
    }

    #[test]
    fn grid_skips_invalid_combinations() {
        let registry = StrategyRegistry::standard();
        let plan = SweepPlan::grid(&registry, "ma_cross").unwrap();
        assert!(plan.len() < plan.grid_size);
        assert!(plan.combos.iter().all(|c| c["short"] < c["long"]));
    }

    #[test]
    fn grid_of_parameterless_strategy_is_single_combo() {
        let registry = StrategyRegistry::standard();
        let plan = SweepPlan::grid(&registry, "buy_and_hold").unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.combos[0].is_empty());
    }

    #[test]
    fn combination_at_matches_materialized_grid() {
        let registry = StrategyRegistry::standard();
        let strategy = registry.get("macd_cross").unwrap();
        let specs = strategy.param_schema();
        let values: Vec<Vec<f64>> = specs.iter().map(ParamSpec::grid_values).collect();
        let grid = strategy.schema().grid();
        for index in [0, 1, 7, 100, grid.len() - 1] {
            assert_eq!(combination_at(specs, &values, index), grid[index]);
        }
    }

    #[test]
    fn for_config_caps_large_grids() {
        let registry = StrategyRegistry::standard();
        let config = RunnerConfig {
            max_combinations: 50,
            ..RunnerConfig::default()
        };
        let plan = SweepPlan::for_config(&registry, "dip_buy", &config).unwrap();
        assert!(plan.len() <= 50);
        assert!(plan.grid_size > 50);
        let again = SweepPlan::for_config(&registry, "dip_buy", &config).unwrap();
        assert_eq!(plan, again);
    }

    #[test]
    fn sample_is_seeded_and_order_preserving() {
        let registry = StrategyRegistry::standard();
        let full = SweepPlan::grid(&registry, "rsi_reversal").unwrap();
        let a = full.clone().sample(10, 7);
        let b = full.clone().sample(10, 7);
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
        let positions: Vec<usize> = a
            .combos
            .iter()
            .map(|c| full.combos.iter().position(|f| f == c).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sample_larger_than_plan_is_noop() {
        let registry = StrategyRegistry::standard();
        let full = SweepPlan::grid(&registry, "periodic_accumulation").unwrap();
        assert_eq!(full.clone().sample(1000, 1), full);
    }

    #[test]
    fn sweep_covers_every_task() {
        let registry = StrategyRegistry::standard();
        let plan = SweepPlan::grid(&registry, "periodic_accumulation").unwrap();
        let symbols = vec![series("BBB", 200), series("AAA", 150)];
        let report = run_sweep(&registry, &plan, &symbols, &config(2)).unwrap();
        assert_eq!(report.outcomes.len(), plan.len() * 2);
        assert_eq!(report.outcomes[0].symbol, "AAA");
        assert_eq!(report.best_per_symbol().len(), 2);
    }

    #[test]
    fn sweep_rejects_empty_inputs() {
        let registry = StrategyRegistry::standard();
        let plan = SweepPlan::grid(&registry, "ma_cross").unwrap();
        assert!(matches!(
            run_sweep(&registry, &plan, &[], &config(1)),
            Err(SweepError::NoSymbols)
        ));
        let empty = SweepPlan::from_combos("ma_cross", Vec::new());
        assert!(matches!(
            run_sweep(&registry, &empty, &[series("A", 50)], &config(1)),
            Err(SweepError::EmptyPlan(_))
        ));
    }

    #[test]
    fn sweep_rejects_malformed_params_up_front() {
        let registry = StrategyRegistry::standard();
        let mut bad = StrategyParams::new();
        bad.insert("short".into(), 1000.0);
        let plan = SweepPlan::from_combos("ma_cross", vec![bad]);
        let err = run_sweep(&registry, &plan, &[series("A", 50)], &config(1)).unwrap_err();
        assert!(matches!(err, SweepError::Strategy(StrategyError::OutOfRange { .. })));
    }
}
