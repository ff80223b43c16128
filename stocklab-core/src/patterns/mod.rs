//! Pattern detector — geometric breakout recognizers over raw bars.
//!
//! Detectors work directly on price geometry and are independent of the
//! strategy registry. Each returns breakout events ordered by bar index,
//! deduplicated so a cluster of qualifying setups reports one event.

pub mod cup_handle;
pub mod gap_reversal;
pub mod peaks;

pub use cup_handle::{detect_cup_with_handle, CupHandleParams};
pub use gap_reversal::{detect_gap_down_reversal, GapReversalParams};
pub use peaks::find_peaks;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    CupWithHandle,
    GapDownReversal,
}

/// The geometry that qualified a breakout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternGeometry {
    CupWithHandle {
        left_peak: usize,
        right_peak: usize,
        /// Index of the lowest low strictly between the peaks.
        bottom: usize,
        /// `min(left high, right high)`.
        rim: f64,
        /// `(rim - bottom low) / rim`.
        cup_depth: f64,
        /// Lowest low between the right peak and the breakout.
        handle_low: f64,
        /// `(right high - handle_low) / right high`.
        handle_pullback: f64,
    },
    GapDownReversal {
        gap_index: usize,
        prior_close: f64,
        gap_open: f64,
        /// `(prior_close - gap_open) / prior_close`.
        gap_pct: f64,
    },
}

/// A detected breakout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEvent {
    /// Breakout bar index.
    pub index: usize,
    pub date: NaiveDate,
    pub geometry: PatternGeometry,
}

impl PatternEvent {
    pub fn kind(&self) -> PatternKind {
        match self.geometry {
            PatternGeometry::CupWithHandle { .. } => PatternKind::CupWithHandle,
            PatternGeometry::GapDownReversal { .. } => PatternKind::GapDownReversal,
        }
    }
}

/// Sort by index and drop events within `dedup_bars` of the last kept one.
///
/// The sort is stable, so among candidates sharing a breakout index the one
/// found first is kept.
pub fn dedup_events(mut events: Vec<PatternEvent>, dedup_bars: usize) -> Vec<PatternEvent> {
    events.sort_by_key(|e| e.index);
    let mut kept: Vec<PatternEvent> = Vec::with_capacity(events.len());
    for event in events {
        match kept.last() {
            Some(last) if event.index - last.index <= dedup_bars => {}
            _ => kept.push(event),
        }
    }
    kept
}

/// Run every detector with default parameters; events sorted by index.
pub fn detect_all(bars: &[Bar]) -> Vec<PatternEvent> {
    let mut events = detect_cup_with_handle(bars, &CupHandleParams::default());
    events.extend(detect_gap_down_reversal(bars, &GapReversalParams::default()));
    events.sort_by_key(|e| e.index);
    events
}
