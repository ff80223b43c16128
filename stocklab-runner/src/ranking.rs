//! Ranking metric — which statistic sweeps and walk-forward optimize by.
//!
//! Scores follow the statistics sentinels: an undefined profit or recovery
//! factor is `+∞` and ranks above every finite value. NaN ranks below
//! everything.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use stocklab_core::stats::BacktestStats;

/// Which statistic to rank by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    #[default]
    Sharpe,
    TotalReturn,
    WinRate,
    ProfitFactor,
    RecoveryFactor,
    AvgReturn,
    MaxDrawdown,
}

impl RankingMetric {
    pub const ALL: [RankingMetric; 7] = [
        Self::Sharpe,
        Self::TotalReturn,
        Self::WinRate,
        Self::ProfitFactor,
        Self::RecoveryFactor,
        Self::AvgReturn,
        Self::MaxDrawdown,
    ];

    /// The raw statistic.
    pub fn extract(&self, stats: &BacktestStats) -> f64 {
        match self {
            Self::Sharpe => stats.sharpe,
            Self::TotalReturn => stats.total_return_pct,
            Self::WinRate => stats.win_rate,
            Self::ProfitFactor => stats.profit_factor,
            Self::RecoveryFactor => stats.recovery_factor,
            Self::AvgReturn => stats.avg_return_pct,
            Self::MaxDrawdown => stats.max_drawdown_pct,
        }
    }

    /// Max drawdown is a positive percentage where smaller is better.
    pub fn is_higher_better(&self) -> bool {
        !matches!(self, Self::MaxDrawdown)
    }

    /// Oriented score: larger is always better.
    pub fn score(&self, stats: &BacktestStats) -> f64 {
        let value = self.extract(stats);
        if self.is_higher_better() {
            value
        } else {
            -value
        }
    }

    /// Returns true if `a` ranks strictly above `b`.
    pub fn is_better(&self, a: &BacktestStats, b: &BacktestStats) -> bool {
        compare_scores(self.score(a), self.score(b)) == Ordering::Greater
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sharpe => "sharpe",
            Self::TotalReturn => "total_return",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::RecoveryFactor => "recovery_factor",
            Self::AvgReturn => "avg_return",
            Self::MaxDrawdown => "max_drawdown",
        }
    }
}

impl std::fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RankingMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown ranking metric: {s}"))
    }
}

/// Total order on scores: NaN lowest, then ascending with `+∞` highest.
pub fn compare_scores(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.total_cmp(&b),
    }
}

/// Sort `items` best-first by `metric`. Stable: ties keep their input order.
pub fn rank_by<T>(
    items: &mut [T],
    metric: RankingMetric,
    stats_of: impl Fn(&T) -> &BacktestStats,
) {
    items.sort_by(|a, b| compare_scores(metric.score(stats_of(b)), metric.score(stats_of(a))));
}

/// Index of the best item, or `None` when empty. The first of equal scores wins.
pub fn best_index<T>(
    items: &[T],
    metric: RankingMetric,
    stats_of: impl Fn(&T) -> &BacktestStats,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, item) in items.iter().enumerate() {
        let score = metric.score(stats_of(item));
        match best {
            Some((_, current)) if compare_scores(score, current) != Ordering::Greater => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(sharpe: f64, profit_factor: f64, max_dd: f64) -> BacktestStats {
        BacktestStats {
            sharpe,
            profit_factor,
            max_drawdown_pct: max_dd,
            ..BacktestStats::default()
        }
    }

    #[test]
    fn infinity_ranks_highest_nan_lowest() {
        let mut items = vec![
            stats(0.0, 1.5, 0.0),
            stats(0.0, f64::NAN, 0.0),
            stats(0.0, f64::INFINITY, 0.0),
            stats(0.0, 0.0, 0.0),
        ];
        rank_by(&mut items, RankingMetric::ProfitFactor, |s| s);
        let order: Vec<f64> = items.iter().map(|s| s.profit_factor).collect();
        assert_eq!(order[0], f64::INFINITY);
        assert_eq!(order[1], 1.5);
        assert_eq!(order[2], 0.0);
        assert!(order[3].is_nan());
    }

    #[test]
    fn max_drawdown_prefers_smaller() {
        let shallow = stats(0.0, 0.0, 5.0);
        let deep = stats(0.0, 0.0, 20.0);
        assert!(RankingMetric::MaxDrawdown.is_better(&shallow, &deep));
        assert!(!RankingMetric::MaxDrawdown.is_better(&deep, &shallow));
    }

    #[test]
    fn rank_is_stable_for_ties() {
        let mut items = vec![
            (0, stats(1.0, 0.0, 0.0)),
            (1, stats(2.0, 0.0, 0.0)),
            (2, stats(1.0, 0.0, 0.0)),
        ];
        rank_by(&mut items, RankingMetric::Sharpe, |(_, s)| s);
        let ids: Vec<usize> = items.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 0, 2]);
    }

    #[test]
    fn best_index_first_of_ties() {
        let items = vec![stats(1.0, 0.0, 0.0), stats(3.0, 0.0, 0.0), stats(3.0, 0.0, 0.0)];
        assert_eq!(best_index(&items, RankingMetric::Sharpe, |s| s), Some(1));
        let empty: Vec<BacktestStats> = Vec::new();
        assert_eq!(best_index(&empty, RankingMetric::Sharpe, |s| s), None);
    }

    #[test]
    fn best_index_skips_leading_nan() {
        let items = vec![stats(f64::NAN, 0.0, 0.0), stats(-1.0, 0.0, 0.0)];
        assert_eq!(best_index(&items, RankingMetric::Sharpe, |s| s), Some(1));
    }

    #[test]
    fn parse_round_trips_through_as_str() {
        for metric in RankingMetric::ALL {
            assert_eq!(metric.as_str().parse::<RankingMetric>().unwrap(), metric);
        }
        assert!("sortino".parse::<RankingMetric>().is_err());
    }
}
