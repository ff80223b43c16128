//! Periodic accumulation — buy a fixed amount every N calendar months.

use chrono::Datelike;

use super::{ExecutionMode, ParamSpec, ResolvedParams, Strategy};
use crate::domain::{Bar, Signal};

const SCHEMA: &[ParamSpec] = &[ParamSpec {
    key: "interval_months",
    label: "Interval (months)",
    min: 1.0,
    max: 12.0,
    step: 1.0,
    default: 1.0,
}];

#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicAccumulation;

fn month_key(bar: &Bar) -> i32 {
    bar.date.year() * 12 + bar.date.month0() as i32
}

impl Strategy for PeriodicAccumulation {
    fn id(&self) -> &'static str {
        "periodic_accumulation"
    }

    fn name(&self) -> &'static str {
        "Periodic accumulation"
    }

    fn description(&self) -> &'static str {
        "Buys a fixed amount on the first bar and on the first bar of every Nth month after it; never sells."
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::FixedAmount
    }

    fn required_bars(&self, _params: &ResolvedParams) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], params: &ResolvedParams) -> Vec<Signal> {
        let interval = params.period("interval_months") as i32;
        let mut signals = Signal::all_hold(bars.len());

        signals[0] = Signal::Buy;
        let mut last_buy = month_key(&bars[0]);
        for i in 1..bars.len() {
            let key = month_key(&bars[i]);
            if key != month_key(&bars[i - 1]) && key - last_buy >= interval {
                signals[i] = Signal::Buy;
                last_buy = key;
            }
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{test_bars, StrategyParams};

    fn buys(interval: f64, days: usize) -> Vec<usize> {
        let mut p = StrategyParams::new();
        p.insert("interval_months".into(), interval);
        let params = PeriodicAccumulation.resolve(&p).unwrap();
        // test_bars starts on 2024-01-01 with one bar per calendar day.
        let signals = PeriodicAccumulation.compute(&test_bars(&vec![100.0; days]), &params);
        assert!(!signals.iter().any(|s| s.is_sell()));
        (0..signals.len()).filter(|&i| signals[i].is_buy()).collect()
    }

    #[test]
    fn monthly_buys_on_first_bar_of_each_month() {
        // Jan 1, Feb 1 (day 31), Mar 1 (day 60, leap year), Apr 1 (day 91).
        assert_eq!(buys(1.0, 100), vec![0, 31, 60, 91]);
    }

    #[test]
    fn quarterly_interval_skips_months() {
        // Jan 1 then Apr 1 then Jul 1 (day 182).
        assert_eq!(buys(3.0, 200), vec![0, 91, 182]);
    }

    #[test]
    fn single_bar_buys_once() {
        assert_eq!(buys(1.0, 1), vec![0]);
    }
}
