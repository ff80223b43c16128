//! Bar-by-bar replay loop.
//!
//! Per bar:
//! 1. If the bar has a usable close, act on its signal under the run's
//!    execution mode
//! 2. Mark to market (void bars carry the last valid close forward)
//! 3. Record the equity point

use tracing::debug;

use crate::domain::{Bar, Signal, Trade};
use crate::stats::BacktestStats;
use crate::strategy::{ExecutionMode, StrategyParams, StrategyRegistry};

use super::state::{BacktestConfig, BacktestResult, EngineError, EngineState};

/// Replay `signals` over `bars` and aggregate statistics.
///
/// - `AllInOut`: a buy while flat commits all cash to whole shares; a sell
///   while long liquidates everything. Other signals are ignored.
/// - `FixedAmount`: each buy spends up to `fixed_amount`; sells are ignored.
///
/// Positions still open at the end are marked to the last close, not sold.
pub fn run_backtest(
    bars: &[Bar],
    signals: &[Signal],
    mode: ExecutionMode,
    config: &BacktestConfig,
) -> Result<BacktestResult, EngineError> {
    config.validate()?;
    if signals.len() != bars.len() {
        return Err(EngineError::LengthMismatch {
            bars: bars.len(),
            signals: signals.len(),
        });
    }
    if bars.is_empty() {
        return Ok(BacktestResult::empty(mode, config));
    }

    let mut state = EngineState::new(config.initial_capital);
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity = Vec::with_capacity(bars.len());

    for (i, (bar, signal)) in bars.iter().zip(signals).enumerate() {
        if bar.is_tradable() {
            state.last_valid_close = Some(bar.close);
            if let Some(trade) = execute(&mut state, i, bar, *signal, mode, config) {
                debug!(
                    bar = i,
                    date = %trade.date,
                    side = ?trade.side,
                    price = trade.price,
                    shares = trade.shares,
                    cash = state.cash,
                    "trade"
                );
                trades.push(trade);
            }
        } else if *signal != Signal::Hold {
            debug!(bar = i, date = %bar.date, "signal on untradable bar ignored");
        }
        equity.push(state.mark(bar.date));
    }

    let final_equity = equity.last().map_or(0.0, |p| p.equity);
    let stats = BacktestStats::compute(&trades, &equity, config.initial_capital);

    Ok(BacktestResult {
        mode,
        trades,
        equity,
        stats,
        initial_capital: config.initial_capital,
        final_equity,
    })
}

fn execute(
    state: &mut EngineState,
    index: usize,
    bar: &Bar,
    signal: Signal,
    mode: ExecutionMode,
    config: &BacktestConfig,
) -> Option<Trade> {
    let price = bar.close;
    match (mode, signal) {
        (_, Signal::Hold) => None,
        (ExecutionMode::AllInOut, Signal::Buy) => {
            if state.is_long() || state.cash <= 0.0 {
                return None;
            }
            let shares = EngineState::affordable_shares(state.cash, price);
            (shares > 0).then(|| state.buy(index, bar.date, price, shares, "entry"))
        }
        (ExecutionMode::AllInOut, Signal::Sell) => state
            .is_long()
            .then(|| state.sell_all(index, bar.date, price, "exit")),
        (ExecutionMode::FixedAmount, Signal::Buy) => {
            let budget = config.fixed_amount.min(state.cash);
            let shares = EngineState::affordable_shares(budget, price);
            (shares > 0).then(|| state.buy(index, bar.date, price, shares, "accumulate"))
        }
        (ExecutionMode::FixedAmount, Signal::Sell) => None,
    }
}

/// Compute a registered strategy's signals and backtest them under the
/// strategy's own execution mode.
pub fn run_strategy(
    registry: &StrategyRegistry,
    strategy_id: &str,
    bars: &[Bar],
    params: &StrategyParams,
    config: &BacktestConfig,
) -> Result<BacktestResult, EngineError> {
    let strategy = registry.get(strategy_id)?;
    let signals = registry.compute(strategy_id, bars, params)?;
    run_backtest(bars, &signals, strategy.execution_mode(), config)
}
