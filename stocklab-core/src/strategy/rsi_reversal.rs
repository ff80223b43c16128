//! RSI reversal — buy the recovery out of oversold, sell the push into overbought.

use super::{ExecutionMode, ParamSpec, ResolvedParams, Strategy, StrategyError};
use crate::domain::{Bar, Signal};
use crate::indicators::{closes, rsi_of_series};

const SCHEMA: &[ParamSpec] = &[
    ParamSpec {
        key: "period",
        label: "RSI period",
        min: 5.0,
        max: 30.0,
        step: 1.0,
        default: 14.0,
    },
    ParamSpec {
        key: "oversold",
        label: "Oversold level",
        min: 10.0,
        max: 45.0,
        step: 5.0,
        default: 30.0,
    },
    ParamSpec {
        key: "overbought",
        label: "Overbought level",
        min: 55.0,
        max: 90.0,
        step: 5.0,
        default: 70.0,
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct RsiReversal;

impl Strategy for RsiReversal {
    fn id(&self) -> &'static str {
        "rsi_reversal"
    }

    fn name(&self) -> &'static str {
        "RSI reversal"
    }

    fn description(&self) -> &'static str {
        "Buys when RSI climbs back above the oversold level; sells when it climbs above the overbought level."
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::AllInOut
    }

    fn validate(&self, params: &ResolvedParams) -> Result<(), StrategyError> {
        if params.get("oversold") >= params.get("overbought") {
            return Err(StrategyError::InvalidCombination {
                strategy: self.id().into(),
                reason: "oversold level must be below overbought level".into(),
            });
        }
        Ok(())
    }

    fn required_bars(&self, params: &ResolvedParams) -> usize {
        // RSI is defined from index `period`; a crossing needs the bar before too.
        params.period("period") + 2
    }

    fn evaluate(&self, bars: &[Bar], params: &ResolvedParams) -> Vec<Signal> {
        let rsi = rsi_of_series(&closes(bars), params.period("period"));
        let oversold = params.get("oversold");
        let overbought = params.get("overbought");

        let mut signals = Signal::all_hold(bars.len());
        for i in 1..bars.len() {
            let (prev, cur) = (rsi[i - 1], rsi[i]);
            if prev.is_nan() || cur.is_nan() {
                continue;
            }
            if prev < oversold && cur >= oversold {
                signals[i] = Signal::Buy;
            } else if prev < overbought && cur >= overbought {
                signals[i] = Signal::Sell;
            }
        }
        signals
    }
}
