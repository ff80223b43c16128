//! Bollinger band mean reversion.
//!
//! Buys when price closes back inside the band after closing below the lower
//! band; sells when price reaches the upper band.

use super::{ExecutionMode, ParamSpec, ResolvedParams, Strategy};
use crate::domain::{Bar, Signal};
use crate::indicators::{bollinger_of_series, closes};

const SCHEMA: &[ParamSpec] = &[
    ParamSpec {
        key: "period",
        label: "Band period",
        min: 10.0,
        max: 40.0,
        step: 5.0,
        default: 20.0,
    },
    ParamSpec {
        key: "k",
        label: "Band width (std devs)",
        min: 1.0,
        max: 3.0,
        step: 0.5,
        default: 2.0,
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct BollingerReversion;

impl Strategy for BollingerReversion {
    fn id(&self) -> &'static str {
        "bollinger_reversion"
    }

    fn name(&self) -> &'static str {
        "Bollinger reversion"
    }

    fn description(&self) -> &'static str {
        "Buys a close back above the lower band after a close below it; sells at the upper band."
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::AllInOut
    }

    fn required_bars(&self, params: &ResolvedParams) -> usize {
        params.period("period") + 1
    }

    fn evaluate(&self, bars: &[Bar], params: &ResolvedParams) -> Vec<Signal> {
        let closes = closes(bars);
        let bands = bollinger_of_series(&closes, params.period("period"), params.get("k"));

        let mut signals = Signal::all_hold(bars.len());
        for i in 1..bars.len() {
            let (lower_prev, lower) = (bands.lower[i - 1], bands.lower[i]);
            let (upper_prev, upper) = (bands.upper[i - 1], bands.upper[i]);
            if lower_prev.is_nan() || lower.is_nan() {
                continue;
            }
            if closes[i - 1] < lower_prev && closes[i] >= lower {
                signals[i] = Signal::Buy;
            } else if closes[i - 1] < upper_prev && closes[i] >= upper {
                signals[i] = Signal::Sell;
            }
        }
        signals
    }
}
