//! StockLab CLI — backtests, scans, pattern detection and sweeps over CSV files.
//!
//! Commands:
//! - `strategies` — list registered strategies and their parameter schemas
//! - `presets` — list the optimized preset table
//! - `backtest` — run one strategy on one CSV file
//! - `scan` — active position and recent entry signals
//! - `patterns` — cup-with-handle and gap-down reversal events
//! - `sweep` — parameter grid over one file or a directory of files
//! - `walk-forward` — in-sample optimize, out-of-sample evaluate
//!
//! Every command prints JSON to stdout; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stocklab_core::domain::PeriodType;
use stocklab_core::engine::run_strategy;
use stocklab_core::patterns::{
    detect_all, detect_cup_with_handle, detect_gap_down_reversal, CupHandleParams,
    GapReversalParams,
};
use stocklab_core::scanner::scan;
use stocklab_core::strategy::{StrategyParams, StrategyRegistry};
use stocklab_runner::{
    load_dir, load_symbol, run_sweep, run_walk_forward, PresetTable, RankingMetric,
    RunnerConfig, SweepPlan, SymbolSeries, WalkForwardConfig,
};

#[derive(Parser)]
#[command(
    name = "stocklab",
    version,
    about = "StockLab CLI — strategy backtesting and price-pattern detection"
)]
struct Cli {
    /// Runner config TOML (capital, workers, ranking metric, ...).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extra preset TOML layered over the built-in table.
    #[arg(long, global = true)]
    presets: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered strategies and their parameter schemas.
    Strategies,
    /// List optimized presets.
    Presets {
        /// Only presets for this strategy.
        #[arg(long)]
        strategy: Option<String>,
    },
    /// Backtest one strategy on one CSV file.
    Backtest {
        #[command(flatten)]
        run: RunArgs,

        /// Include the full equity curve in the output.
        #[arg(long, default_value_t = false)]
        equity: bool,
    },
    /// Report the open position and recent entry signals.
    Scan {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Detect chart patterns.
    Patterns {
        /// CSV file with date,open,high,low,close,volume columns.
        #[arg(long)]
        data: PathBuf,

        /// cup, gap, or all.
        #[arg(long, default_value = "all")]
        kind: String,
    },
    /// Sweep a strategy's parameter grid over one file or a directory of files.
    Sweep {
        /// CSV file or directory of CSV files (one symbol per file).
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        strategy: String,

        /// Bar interval of the data.
        #[arg(long)]
        period: Option<PeriodType>,

        /// Ranking metric (overrides the config file).
        #[arg(long)]
        metric: Option<RankingMetric>,

        /// Number of ranked outcomes to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Walk-forward validate a strategy's parameter grid on one file.
    WalkForward {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        strategy: String,

        #[arg(long)]
        period: Option<PeriodType>,

        #[arg(long)]
        metric: Option<RankingMetric>,

        #[arg(long, default_value_t = 5)]
        folds: usize,

        /// Bars in the first in-sample window.
        #[arg(long, default_value_t = 252)]
        min_is: usize,

        /// Minimum bars per out-of-sample window.
        #[arg(long, default_value_t = 63)]
        min_oos: usize,

        /// Minimum series length.
        #[arg(long, default_value_t = 756)]
        min_total: usize,
    },
}

/// Arguments shared by single-strategy commands.
#[derive(Args)]
struct RunArgs {
    /// CSV file with date,open,high,low,close,volume columns.
    #[arg(long)]
    data: PathBuf,

    #[arg(long)]
    strategy: String,

    /// Bar interval of the data (defaults to the config's period type).
    #[arg(long)]
    period: Option<PeriodType>,

    /// Start from a named preset for (strategy, period).
    #[arg(long)]
    preset: Option<String>,

    /// Parameter override, repeatable: --param short=5 --param long=20.
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, f64)>,
}

fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("parameter '{key}' is not a number: '{value}'"))?;
    Ok((key.trim().to_string(), value))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    let mut presets = PresetTable::builtin()?;
    if let Some(path) = &cli.presets {
        presets.merge(PresetTable::load(path)?);
    }
    let registry = StrategyRegistry::standard();
    presets.validate(&registry)?;

    match cli.command {
        Commands::Strategies => {
            let infos: Vec<_> = registry.iter().map(|s| s.info()).collect();
            print_json(&infos)
        }
        Commands::Presets { strategy } => {
            let listed: Vec<_> = presets
                .iter()
                .filter(|p| strategy.as_deref().map_or(true, |s| p.strategy == s))
                .collect();
            print_json(&listed)
        }
        Commands::Backtest { run, equity } => {
            run_backtest_cmd(&registry, &presets, &config, &run, equity)
        }
        Commands::Scan { run } => run_scan_cmd(&registry, &presets, &config, &run),
        Commands::Patterns { data, kind } => run_patterns_cmd(&data, &kind, &config),
        Commands::Sweep {
            data,
            strategy,
            period,
            metric,
            top,
        } => {
            let config = with_overrides(config, metric);
            let period = period.unwrap_or(config.period_type);
            run_sweep_cmd(&registry, &config, &data, &strategy, period, top)
        }
        Commands::WalkForward {
            data,
            strategy,
            period,
            metric,
            folds,
            min_is,
            min_oos,
            min_total,
        } => {
            let config = with_overrides(config, metric);
            let series = load_symbol(&data, period.unwrap_or(config.period_type))
                .with_context(|| format!("loading {}", data.display()))?;
            let wf = WalkForwardConfig {
                n_folds: folds,
                min_total_bars: min_total,
                min_is_bars: min_is,
                min_oos_bars: min_oos,
            };
            let plan = SweepPlan::for_config(&registry, &strategy, &config)?;
            let result = run_walk_forward(&registry, &plan, &series, &wf, &config)?;
            print_json(&result)
        }
    }
}

fn with_overrides(mut config: RunnerConfig, metric: Option<RankingMetric>) -> RunnerConfig {
    if let Some(metric) = metric {
        config.ranking_metric = metric;
    }
    config
}

/// Preset values first, then explicit `--param` overrides.
fn resolve_run_params(
    presets: &PresetTable,
    run: &RunArgs,
    period: PeriodType,
) -> Result<StrategyParams> {
    let mut params = match &run.preset {
        Some(name) => presets.require(&run.strategy, name, period)?.clone(),
        None => StrategyParams::new(),
    };
    for (key, value) in &run.params {
        params.insert(key.clone(), *value);
    }
    Ok(params)
}

fn load_run_series(run: &RunArgs, config: &RunnerConfig) -> Result<SymbolSeries> {
    let period = run.period.unwrap_or(config.period_type);
    load_symbol(&run.data, period).with_context(|| format!("loading {}", run.data.display()))
}

#[derive(Serialize)]
struct BacktestOutput<'a> {
    symbol: &'a str,
    strategy: &'a str,
    params: &'a StrategyParams,
    initial_capital: f64,
    final_equity: f64,
    stats: &'a stocklab_core::stats::BacktestStats,
    trades: &'a [stocklab_core::domain::Trade],
    #[serde(skip_serializing_if = "Option::is_none")]
    equity: Option<&'a [stocklab_core::domain::EquityPoint]>,
}

fn run_backtest_cmd(
    registry: &StrategyRegistry,
    presets: &PresetTable,
    config: &RunnerConfig,
    run: &RunArgs,
    include_equity: bool,
) -> Result<()> {
    let series = load_run_series(run, config)?;
    let params = resolve_run_params(presets, run, series.period_type)?;
    let result = run_strategy(
        registry,
        &run.strategy,
        &series.bars,
        &params,
        &config.backtest_config(),
    )?;
    info!(
        symbol = %series.symbol,
        strategy = %run.strategy,
        trades = result.trades.len(),
        "backtest complete"
    );
    print_json(&BacktestOutput {
        symbol: &series.symbol,
        strategy: &run.strategy,
        params: &params,
        initial_capital: result.initial_capital,
        final_equity: result.final_equity,
        stats: &result.stats,
        trades: &result.trades,
        equity: include_equity.then_some(result.equity.as_slice()),
    })
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    symbol: &'a str,
    strategy: &'a str,
    #[serde(flatten)]
    scan: stocklab_core::scanner::ScanResult,
}

fn run_scan_cmd(
    registry: &StrategyRegistry,
    presets: &PresetTable,
    config: &RunnerConfig,
    run: &RunArgs,
) -> Result<()> {
    let series = load_run_series(run, config)?;
    let params = resolve_run_params(presets, run, series.period_type)?;
    let signals = registry.compute(&run.strategy, &series.bars, &params)?;
    print_json(&ScanOutput {
        symbol: &series.symbol,
        strategy: &run.strategy,
        scan: scan(&series.bars, &signals, series.period_type),
    })
}

fn run_patterns_cmd(data: &Path, kind: &str, config: &RunnerConfig) -> Result<()> {
    let series = load_symbol(data, config.period_type)
        .with_context(|| format!("loading {}", data.display()))?;
    let events = match kind {
        "cup" => detect_cup_with_handle(&series.bars, &CupHandleParams::default()),
        "gap" => detect_gap_down_reversal(&series.bars, &GapReversalParams::default()),
        "all" => detect_all(&series.bars),
        other => bail!("unknown pattern kind '{other}' (expected cup, gap or all)"),
    };
    info!(symbol = %series.symbol, events = events.len(), "pattern scan complete");
    print_json(&events)
}

#[derive(Serialize)]
struct SweepOutput<'a> {
    strategy: &'a str,
    metric: RankingMetric,
    grid_size: usize,
    combinations: usize,
    symbols: usize,
    best_per_symbol: Vec<&'a stocklab_runner::SweepOutcome>,
    top: Vec<&'a stocklab_runner::SweepOutcome>,
}

fn run_sweep_cmd(
    registry: &StrategyRegistry,
    config: &RunnerConfig,
    data: &Path,
    strategy: &str,
    period: PeriodType,
    top: usize,
) -> Result<()> {
    let symbols = if data.is_dir() {
        load_dir(data, period)?
    } else {
        vec![load_symbol(data, period)?]
    };
    let plan = SweepPlan::for_config(registry, strategy, config)?;
    let report = run_sweep(registry, &plan, &symbols, config)?;
    print_json(&SweepOutput {
        strategy: &report.strategy_id,
        metric: report.metric,
        grid_size: report.grid_size,
        combinations: report.combinations,
        symbols: report.symbols,
        best_per_symbol: report.best_per_symbol(),
        top: report.ranked().into_iter().take(top).collect(),
    })
}
