//! Statistics aggregator — pure functions over trades and the equity curve.
//!
//! Degenerate inputs never produce errors or NaN: ratios fall back to the
//! sentinels `0.0` (nothing happened) or `f64::INFINITY` (gains with no
//! losses / no drawdown).

use serde::{Deserialize, Serialize};

use crate::domain::{float_serde, EquityPoint, RoundTrip, Trade, TradeSide};

/// Periods per year used to annualize the Sharpe ratio.
pub const PERIODS_PER_YEAR: f64 = 250.0;

/// Five-number summary (plus mean) of round-trip holding periods, in
/// calendar days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingPeriodStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

/// Aggregate statistics of one backtest. All-zero by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestStats {
    pub total_return_pct: f64,
    pub trade_count: usize,
    pub round_trip_count: usize,
    /// Winning round trips as a percentage of all round trips.
    pub win_rate: f64,
    pub gross_profit: f64,
    /// Positive magnitude of the summed losses.
    pub gross_loss: f64,
    #[serde(with = "float_serde")]
    pub profit_factor: f64,
    pub avg_return_pct: f64,
    pub best_return_pct: f64,
    pub worst_return_pct: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub sharpe: f64,
    pub max_drawdown_pct: f64,
    pub avg_drawdown_pct: f64,
    #[serde(with = "float_serde")]
    pub recovery_factor: f64,
    pub holding_period: HoldingPeriodStats,
    /// Share of bars with a non-zero position, in percent.
    pub exposure_pct: f64,
}

impl BacktestStats {
    pub fn compute(trades: &[Trade], equity: &[EquityPoint], initial_capital: f64) -> Self {
        let trips = round_trips(trades);
        let total_return = total_return_pct(equity, initial_capital);
        let max_dd = max_drawdown_pct(equity);
        let returns: Vec<f64> = trips.iter().map(|t| t.return_pct).collect();

        Self {
            total_return_pct: total_return,
            trade_count: trades.len(),
            round_trip_count: trips.len(),
            win_rate: win_rate(&trips),
            gross_profit: gross_profit(&trips),
            gross_loss: gross_loss(&trips),
            profit_factor: profit_factor(&trips),
            avg_return_pct: mean_f64(&returns),
            best_return_pct: returns.iter().copied().reduce(f64::max).unwrap_or(0.0),
            worst_return_pct: returns.iter().copied().reduce(f64::min).unwrap_or(0.0),
            max_consecutive_wins: max_consecutive(&trips, RoundTrip::is_winner),
            max_consecutive_losses: max_consecutive(&trips, RoundTrip::is_loser),
            sharpe: sharpe_ratio(equity),
            max_drawdown_pct: max_dd,
            avg_drawdown_pct: avg_drawdown_pct(equity),
            recovery_factor: recovery_factor(total_return, max_dd),
            holding_period: holding_period_stats(&trips),
            exposure_pct: exposure_pct(equity),
        }
    }
}

// ─── Round trips ────────────────────────────────────────────────────

/// Pair each entry with the next exit.
///
/// A buy while an entry is pending is ignored (fixed-amount runs stack
/// buys; only the first opens the trip). A sell with nothing pending is
/// ignored, and a trailing unmatched buy produces nothing.
pub fn round_trips(trades: &[Trade]) -> Vec<RoundTrip> {
    let mut pending: Option<&Trade> = None;
    let mut trips = Vec::new();
    for trade in trades {
        match trade.side {
            TradeSide::Buy => {
                if pending.is_none() {
                    pending = Some(trade);
                }
            }
            TradeSide::Sell => {
                if let Some(entry) = pending.take() {
                    trips.push(RoundTrip::from_pair(entry, trade));
                }
            }
        }
    }
    trips
}

// ─── Individual metric functions ────────────────────────────────────

/// `(final - initial) / initial * 100`; 0 for an empty curve or no capital.
pub fn total_return_pct(equity: &[EquityPoint], initial_capital: f64) -> f64 {
    match equity.last() {
        Some(last) if initial_capital > 0.0 => {
            (last.equity - initial_capital) / initial_capital * 100.0
        }
        _ => 0.0,
    }
}

pub fn win_rate(trips: &[RoundTrip]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    let wins = trips.iter().filter(|t| t.is_winner()).count();
    wins as f64 / trips.len() as f64 * 100.0
}

pub fn gross_profit(trips: &[RoundTrip]) -> f64 {
    trips.iter().filter(|t| t.profit > 0.0).map(|t| t.profit).sum()
}

pub fn gross_loss(trips: &[RoundTrip]) -> f64 {
    trips
        .iter()
        .filter(|t| t.profit < 0.0)
        .map(|t| t.profit.abs())
        .sum()
}

/// Gross profit / gross loss.
///
/// `+∞` when there are profits and no losses; `0` when both are zero.
pub fn profit_factor(trips: &[RoundTrip]) -> f64 {
    let profit = gross_profit(trips);
    let loss = gross_loss(trips);
    if loss == 0.0 {
        return if profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    profit / loss
}

/// Annualized Sharpe ratio of per-bar percentage equity changes.
///
/// Bars whose previous equity is not positive are skipped. Sample standard
/// deviation (n − 1), scaled by √250. Returns 0 with fewer than two valid
/// changes or zero variance.
pub fn sharpe_ratio(equity: &[EquityPoint]) -> f64 {
    let returns = period_returns_pct(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * PERIODS_PER_YEAR.sqrt()
}

pub fn max_drawdown_pct(equity: &[EquityPoint]) -> f64 {
    equity.iter().map(|p| p.drawdown).fold(0.0, f64::max) * 100.0
}

pub fn avg_drawdown_pct(equity: &[EquityPoint]) -> f64 {
    let drawdowns: Vec<f64> = equity.iter().map(|p| p.drawdown).collect();
    mean_f64(&drawdowns) * 100.0
}

/// Total return / max drawdown.
///
/// With no drawdown: `+∞` for a positive return, otherwise `0`.
pub fn recovery_factor(total_return_pct: f64, max_drawdown_pct: f64) -> f64 {
    if max_drawdown_pct == 0.0 {
        return if total_return_pct > 0.0 { f64::INFINITY } else { 0.0 };
    }
    total_return_pct / max_drawdown_pct.abs()
}

pub fn holding_period_stats(trips: &[RoundTrip]) -> HoldingPeriodStats {
    let mut days: Vec<f64> = trips.iter().map(|t| t.holding_days as f64).collect();
    if days.is_empty() {
        return HoldingPeriodStats::default();
    }
    days.sort_by(f64::total_cmp);
    HoldingPeriodStats {
        min: days[0],
        q1: percentile(&days, 0.25),
        median: percentile(&days, 0.5),
        q3: percentile(&days, 0.75),
        max: days[days.len() - 1],
        mean: mean_f64(&days),
    }
}

pub fn exposure_pct(equity: &[EquityPoint]) -> f64 {
    if equity.is_empty() {
        return 0.0;
    }
    let exposed = equity.iter().filter(|p| p.position > 0.0).count();
    exposed as f64 / equity.len() as f64 * 100.0
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Percentage change between consecutive equity points with a positive base.
pub fn period_returns_pct(equity: &[EquityPoint]) -> Vec<f64> {
    equity
        .windows(2)
        .filter(|w| w[0].equity > 0.0)
        .map(|w| (w[1].equity - w[0].equity) / w[0].equity * 100.0)
        .collect()
}

/// Linear-interpolation percentile of an ascending slice, `p` in `[0, 1]`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trips: &[RoundTrip], counts: fn(&RoundTrip) -> bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trip in trips {
        if counts(trip) {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn fill(side: TradeSide, offset: i64, price: f64) -> Trade {
        Trade {
            bar_index: offset as usize,
            date: day(offset),
            side,
            price,
            shares: 10,
            value: price * 10.0,
            reason: String::new(),
        }
    }

    fn point(offset: i64, equity: f64, drawdown: f64) -> EquityPoint {
        EquityPoint {
            date: day(offset),
            equity,
            cash: equity,
            position: 0.0,
            drawdown,
        }
    }

    fn trips(pairs: &[(f64, f64)]) -> Vec<RoundTrip> {
        let mut trades = Vec::new();
        for (k, &(entry, exit)) in pairs.iter().enumerate() {
            let base = 10 * k as i64;
            trades.push(fill(TradeSide::Buy, base, entry));
            trades.push(fill(TradeSide::Sell, base + 3, exit));
        }
        round_trips(&trades)
    }

    #[test]
    fn pairing_ignores_stacked_buys_and_trailing_entry() {
        let trades = vec![
            fill(TradeSide::Sell, 0, 9.0),
            fill(TradeSide::Buy, 1, 10.0),
            fill(TradeSide::Buy, 2, 11.0),
            fill(TradeSide::Sell, 5, 12.0),
            fill(TradeSide::Buy, 6, 13.0),
        ];
        let trips = round_trips(&trades);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].entry_price, 10.0);
        assert_eq!(trips[0].holding_days, 4);
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let t = trips(&[(10.0, 12.0), (10.0, 9.0), (10.0, 11.0), (10.0, 10.0)]);
        assert_eq!(win_rate(&t), 50.0);
        assert_eq!(gross_profit(&t), 30.0);
        assert_eq!(gross_loss(&t), 10.0);
        assert_eq!(profit_factor(&t), 3.0);
    }

    #[test]
    fn profit_factor_sentinels() {
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(profit_factor(&trips(&[(10.0, 10.0)])), 0.0);
        assert_eq!(profit_factor(&trips(&[(10.0, 11.0)])), f64::INFINITY);
        assert_eq!(profit_factor(&trips(&[(10.0, 9.0)])), 0.0);
    }

    #[test]
    fn streaks() {
        let t = trips(&[
            (1.0, 2.0),
            (1.0, 2.0),
            (1.0, 0.5),
            (1.0, 2.0),
            (1.0, 0.5),
            (1.0, 0.5),
            (1.0, 0.5),
        ]);
        assert_eq!(max_consecutive(&t, RoundTrip::is_winner), 2);
        assert_eq!(max_consecutive(&t, RoundTrip::is_loser), 3);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 0.5), 2.5);
        assert_eq!(percentile(&v, 0.25), 1.75);
        assert_eq!(percentile(&v, 1.0), 4.0);
        assert_eq!(percentile(&[7.0], 0.3), 7.0);
    }

    #[test]
    fn holding_periods_summary() {
        // Every trip in `trips` holds 3 calendar days.
        let stats = holding_period_stats(&trips(&[(1.0, 2.0), (1.0, 3.0)]));
        assert_eq!(stats.min, 3.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(holding_period_stats(&[]), HoldingPeriodStats::default());
    }

    #[test]
    fn sharpe_needs_two_valid_changes_and_variance() {
        assert_eq!(sharpe_ratio(&[point(0, 100.0, 0.0), point(1, 110.0, 0.0)]), 0.0);
        let flat: Vec<EquityPoint> = (0..5).map(|i| point(i, 100.0, 0.0)).collect();
        assert_eq!(sharpe_ratio(&flat), 0.0);

        let curve = [
            point(0, 100.0, 0.0),
            point(1, 110.0, 0.0),
            point(2, 99.0, 0.1),
            point(3, 108.9, 0.01),
        ];
        // Changes: +10%, -10%, +10%.
        let returns = [10.0, -10.0, 10.0];
        let expected = mean_f64(&returns) / std_dev(&returns) * 250f64.sqrt();
        assert!((sharpe_ratio(&curve) - expected).abs() < 1e-9);
    }

    #[test]
    fn sharpe_skips_non_positive_bases() {
        let curve = [point(0, 0.0, 0.0), point(1, 100.0, 0.0), point(2, 110.0, 0.0)];
        // Only one valid change remains.
        assert_eq!(period_returns_pct(&curve).len(), 1);
        assert_eq!(sharpe_ratio(&curve), 0.0);
    }

    #[test]
    fn recovery_factor_sentinels() {
        assert_eq!(recovery_factor(25.0, 0.0), f64::INFINITY);
        assert_eq!(recovery_factor(0.0, 0.0), 0.0);
        assert_eq!(recovery_factor(-5.0, 0.0), 0.0);
        assert_eq!(recovery_factor(20.0, 10.0), 2.0);
    }

    #[test]
    fn default_stats_are_zero() {
        let stats = BacktestStats::compute(&[], &[], 1_000.0);
        assert_eq!(stats, BacktestStats::default());
    }

    #[test]
    fn infinite_ratios_survive_json() {
        let stats = BacktestStats {
            profit_factor: f64::INFINITY,
            ..BacktestStats::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"profit_factor\":\"inf\""));
        let back: BacktestStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back.profit_factor, f64::INFINITY);
    }

    #[test]
    fn compute_with_drawdowns_and_uneven_holds() {
        // Trips held 1, 2 and 4 calendar days.
        let trades = vec![
            fill(TradeSide::Buy, 0, 10.0),
            fill(TradeSide::Sell, 1, 11.0),
            fill(TradeSide::Buy, 2, 10.0),
            fill(TradeSide::Sell, 4, 9.0),
            fill(TradeSide::Buy, 5, 10.0),
            fill(TradeSide::Sell, 9, 12.0),
        ];
        let curve = [
            (1_000.0, 0.0, 10.0),
            (1_000.0, 0.0, 0.0),
            (750.0, 0.25, 10.0),
            (1_000.0, 0.0, 10.0),
            (500.0, 0.5, 0.0),
            (1_000.0, 0.0, 10.0),
            (1_100.0, 0.0, 10.0),
            (1_150.0, 0.0, 10.0),
            (1_200.0, 0.0, 10.0),
            (1_200.0, 0.0, 0.0),
        ];
        let equity: Vec<EquityPoint> = curve
            .iter()
            .enumerate()
            .map(|(i, &(value, drawdown, position))| EquityPoint {
                position,
                ..point(i as i64, value, drawdown)
            })
            .collect();

        let stats = BacktestStats::compute(&trades, &equity, 1_000.0);
        let near = |a: f64, b: f64| (a - b).abs() < 1e-9;

        assert_eq!(stats.round_trip_count, 3);
        assert!(near(stats.total_return_pct, 20.0));
        assert!(near(stats.max_drawdown_pct, 50.0));
        assert!(near(stats.avg_drawdown_pct, 7.5));
        assert!(near(stats.recovery_factor, 0.4));
        assert!(near(stats.exposure_pct, 70.0));

        let hp = &stats.holding_period;
        assert_eq!(hp.min, 1.0);
        assert!(near(hp.q1, 1.5));
        assert_eq!(hp.median, 2.0);
        assert!(near(hp.q3, 3.0));
        assert_eq!(hp.max, 4.0);
        assert!(near(hp.mean, 7.0 / 3.0));
    }
}
