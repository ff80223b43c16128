//! MACD signal-line crossover.

use super::{ExecutionMode, ParamSpec, ResolvedParams, Strategy, StrategyError};
use crate::domain::{Bar, Signal};
use crate::indicators::{closes, macd_of_series};

const SCHEMA: &[ParamSpec] = &[
    ParamSpec {
        key: "short",
        label: "Fast EMA period",
        min: 6.0,
        max: 18.0,
        step: 2.0,
        default: 12.0,
    },
    ParamSpec {
        key: "long",
        label: "Slow EMA period",
        min: 20.0,
        max: 40.0,
        step: 2.0,
        default: 26.0,
    },
    ParamSpec {
        key: "signal",
        label: "Signal EMA period",
        min: 5.0,
        max: 13.0,
        step: 2.0,
        default: 9.0,
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct MacdCross;

impl Strategy for MacdCross {
    fn id(&self) -> &'static str {
        "macd_cross"
    }

    fn name(&self) -> &'static str {
        "MACD crossover"
    }

    fn description(&self) -> &'static str {
        "Buys when the MACD line crosses above its signal line; sells on the cross back below."
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
                reason: "fast period must be below slow period".into(),
            });
        }
        Ok(())
    }

    fn required_bars(&self, params: &ResolvedParams) -> usize {
        // Histogram first defined at long + signal - 2; one more bar to compare.
        params.period("long") + params.period("signal")
    }

    fn evaluate(&self, bars: &[Bar], params: &ResolvedParams) -> Vec<Signal> {
        let series = macd_of_series(
            &closes(bars),
            params.period("short"),
            params.period("long"),
            params.period("signal"),
        );
        let hist = &series.histogram;

        let mut signals = Signal::all_hold(bars.len());
        for i in 1..bars.len() {
            let (prev, cur) = (hist[i - 1], hist[i]);
            if prev.is_nan() || cur.is_nan() {
                continue;
            }
            if prev <= 0.0 && cur > 0.0 {
                signals[i] = Signal::Buy;
            } else if prev >= 0.0 && cur < 0.0 {
                signals[i] = Signal::Sell;
            }
        }
        signals
    }
}
