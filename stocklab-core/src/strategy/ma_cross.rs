//! Moving average crossover — golden cross buys, dead cross sells.

use super::{
    crossed_above, crossed_below, ExecutionMode, ParamSpec, ResolvedParams, Strategy,
    StrategyError,
};
use crate::domain::{Bar, Signal};
use crate::indicators::{closes, sma_of_series};

const SCHEMA: &[ParamSpec] = &[
    ParamSpec {
        key: "short",
        label: "Short MA period",
        min: 3.0,
        max: 30.0,
        step: 1.0,
        default: 5.0,
    },
    ParamSpec {
        key: "long",
        label: "Long MA period",
        min: 10.0,
        max: 100.0,
        step: 5.0,
        default: 25.0,
    },
];

/// Buys when SMA(short) crosses above SMA(long), sells when it crosses below.
///
/// The first crossing can only be observed at index `long` (both averages
/// defined on the current and previous bar), so `long + 1` bars are required.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaCross;

impl Strategy for MaCross {
    fn id(&self) -> &'static str {
        "ma_cross"
    }

    fn name(&self) -> &'static str {
        "Moving average cross"
    }

    fn description(&self) -> &'static str {
        "Golden cross of the short SMA over the long SMA buys; dead cross sells."
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::AllInOut
    }

    fn validate(&self, params: &ResolvedParams) -> Result<(), StrategyError> {
        if params.period("short") >= params.period("long") {
            return Err(StrategyError::InvalidCombination {
                strategy: self.id().into(),
                reason: "short period must be below long period".into(),
            });
        }
        Ok(())
    }

    fn required_bars(&self, params: &ResolvedParams) -> usize {
        params.period("long") + 1
    }

    fn evaluate(&self, bars: &[Bar], params: &ResolvedParams) -> Vec<Signal> {
        let closes = closes(bars);
        let fast = sma_of_series(&closes, params.period("short"));
        let slow = sma_of_series(&closes, params.period("long"));

        let mut signals = Signal::all_hold(bars.len());
        for i in 1..bars.len() {
            if crossed_above(fast[i - 1], slow[i - 1], fast[i], slow[i]) {
                signals[i] = Signal::Buy;
            } else if crossed_below(fast[i - 1], slow[i - 1], fast[i], slow[i]) {
                signals[i] = Signal::Sell;
            }
        }
        signals
    }
}
