//! Dip buying with take-profit, stop-loss and a holding cap.
//!
//! A three-state machine over closes:
//! - **Flat**: track the running high; arm once price dips `dip_pct` below it.
//! - **Armed**: track the trough; buy once price recovers `recovery_pct` off it.
//! - **Long**: sell at `take_profit_pct` above entry, `stop_loss_pct` below
//!   entry, or after `max_hold_bars` bars, whichever comes first.
//!
//! After a sell the running high restarts from the exit close.

use super::{ExecutionMode, ParamSpec, ResolvedParams, Strategy};
use crate::domain::{Bar, Signal};

const SCHEMA: &[ParamSpec] = &[
    ParamSpec {
        key: "dip_pct",
        label: "Dip from high (%)",
        min: 1.0,
        max: 20.0,
        step: 1.0,
        default: 3.0,
    },
    ParamSpec {
        key: "recovery_pct",
        label: "Recovery off trough (%)",
        min: 1.0,
        max: 20.0,
        step: 1.0,
        default: 5.0,
    },
    ParamSpec {
        key: "take_profit_pct",
        label: "Take profit (%)",
        min: 2.0,
        max: 50.0,
        step: 2.0,
        default: 10.0,
    },
    ParamSpec {
        key: "stop_loss_pct",
        label: "Stop loss (%)",
        min: 1.0,
        max: 30.0,
        step: 1.0,
        default: 5.0,
    },
    ParamSpec {
        key: "max_hold_bars",
        label: "Max holding bars",
        min: 5.0,
        max: 250.0,
        step: 5.0,
        default: 60.0,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Flat { high: f64 },
    Armed { trough: f64 },
    Long { entry: f64, since: usize },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DipBuy;

impl Strategy for DipBuy {
    fn id(&self) -> &'static str {
        "dip_buy"
    }

    fn name(&self) -> &'static str {
        "Dip buy"
    }

    fn description(&self) -> &'static str {
        "Buys the rebound after a pullback from the running high; exits on target, stop, or time."
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::AllInOut
    }

    fn required_bars(&self, _params: &ResolvedParams) -> usize {
        2
    }

    fn evaluate(&self, bars: &[Bar], params: &ResolvedParams) -> Vec<Signal> {
        let dip = params.fraction("dip_pct");
        let recovery = params.fraction("recovery_pct");
        let take_profit = params.fraction("take_profit_pct");
        let stop_loss = params.fraction("stop_loss_pct");
        let max_hold = params.period("max_hold_bars");

        let mut signals = Signal::all_hold(bars.len());
        let mut phase = Phase::Flat {
            high: bars[0].close,
        };

        for (i, bar) in bars.iter().enumerate().skip(1) {
            let close = bar.close;
            phase = match phase {
                Phase::Flat { high } => {
                    let high = high.max(close);
                    if close <= high * (1.0 - dip) {
                        Phase::Armed { trough: close }
                    } else {
                        Phase::Flat { high }
                    }
                }
                Phase::Armed { trough } => {
                    let trough = trough.min(close);
                    if close >= trough * (1.0 + recovery) {
                        signals[i] = Signal::Buy;
                        Phase::Long {
                            entry: close,
                            since: i,
                        }
                    } else {
                        Phase::Armed { trough }
                    }
                }
                Phase::Long { entry, since } => {
                    let exit = close >= entry * (1.0 + take_profit)
                        || close <= entry * (1.0 - stop_loss)
                        || i - since >= max_hold;
                    if exit {
                        signals[i] = Signal::Sell;
                        Phase::Flat { high: close }
                    } else {
                        Phase::Long { entry, since }
                    }
                }
            };
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{test_bars, StrategyParams};

    fn defaults() -> ResolvedParams {
        DipBuy.resolve(&StrategyParams::new()).unwrap()
    }

    fn indices(signals: &[Signal], pred: fn(&Signal) -> bool) -> Vec<usize> {
        (0..signals.len()).filter(|&i| pred(&signals[i])).collect()
    }

    #[test]
    fn dip_recovery_then_take_profit() {
        let closes = [
            100.0, 100.0, 100.0, 100.0, 100.0, 96.0, 95.0, 97.0, 100.0, 103.0, 106.0, 108.0,
            111.0, 111.0, 111.0,
        ];
        let signals = DipBuy.compute(&test_bars(&closes), &defaults());
        assert_eq!(indices(&signals, Signal::is_buy), vec![8]);
        assert_eq!(indices(&signals, Signal::is_sell), vec![12]);
    }

    #[test]
    fn stop_loss_exit() {
        let closes = [100.0, 96.0, 101.0, 99.0, 95.0];
        let signals = DipBuy.compute(&test_bars(&closes), &defaults());
        assert_eq!(indices(&signals, Signal::is_buy), vec![2]);
        assert_eq!(indices(&signals, Signal::is_sell), vec![4]);
    }

    #[test]
    fn holding_cap_exit() {
        let mut p = StrategyParams::new();
        p.insert("max_hold_bars".into(), 5.0);
        let params = DipBuy.resolve(&p).unwrap();

        let mut closes = vec![100.0, 96.0, 101.0];
        closes.extend([102.0; 6]);
        let signals = DipBuy.compute(&test_bars(&closes), &params);
        assert_eq!(indices(&signals, Signal::is_buy), vec![2]);
        assert_eq!(indices(&signals, Signal::is_sell), vec![7]);
    }

    #[test]
    fn steady_uptrend_never_buys() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let signals = DipBuy.compute(&test_bars(&closes), &defaults());
        assert!(signals.iter().all(|s| *s == Signal::Hold));
    }
}
