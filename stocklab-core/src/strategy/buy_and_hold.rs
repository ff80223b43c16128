//! Buy on the first bar and never sell. The benchmark every rule is compared with.

use super::{ExecutionMode, ParamSpec, ResolvedParams, Strategy};
use crate::domain::{Bar, Signal};

#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHold;

impl Strategy for BuyAndHold {
    fn id(&self) -> &'static str {
        "buy_and_hold"
    }

    fn name(&self) -> &'static str {
        "Buy and hold"
    }

    fn description(&self) -> &'static str {
        "Buys on the first bar and holds to the end of the series."
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::AllInOut
    }

    fn required_bars(&self, _params: &ResolvedParams) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], _params: &ResolvedParams) -> Vec<Signal> {
        let mut signals = Signal::all_hold(bars.len());
        if let Some(first) = signals.first_mut() {
            *first = Signal::Buy;
        }
        signals
    }
}
