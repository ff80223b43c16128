//! Gap-down reversal detection.
//!
//! A bar that opens well below the prior close, followed within a few bars
//! by a bullish close back at or above that prior close.

use serde::{Deserialize, Serialize};

use super::{dedup_events, PatternEvent, PatternGeometry};
use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapReversalParams {
    /// Minimum gap as a fraction of the prior close.
    pub min_gap_pct: f64,
    /// Bars after the gap bar in which the reversal may complete.
    pub max_reversal_bars: usize,
    pub dedup_bars: usize,
}

impl Default for GapReversalParams {
    fn default() -> Self {
        Self {
            min_gap_pct: 0.02,
            max_reversal_bars: 5,
            dedup_bars: 5,
        }
    }
}

pub fn detect_gap_down_reversal(bars: &[Bar], params: &GapReversalParams) -> Vec<PatternEvent> {
    let mut events = Vec::new();

    for g in 1..bars.len() {
        let prior_close = bars[g - 1].close;
        let gap_open = bars[g].open;
        if prior_close.is_nan() || prior_close <= 0.0 || gap_open.is_nan() {
            continue;
        }
        if gap_open > prior_close * (1.0 - params.min_gap_pct) {
            continue;
        }

        let last = (g + params.max_reversal_bars).min(bars.len() - 1);
        let reversal = (g..=last).find(|&j| bars[j].close >= prior_close && bars[j].is_bullish());
        if let Some(j) = reversal {
            events.push(PatternEvent {
                index: j,
                date: bars[j].date,
                geometry: PatternGeometry::GapDownReversal {
                    gap_index: g,
                    prior_close,
                    gap_open,
                    gap_pct: (prior_close - gap_open) / prior_close,
                },
            });
        }
    }

    dedup_events(events, params.dedup_bars)
}
