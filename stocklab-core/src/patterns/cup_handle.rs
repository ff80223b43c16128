//! Cup-with-handle breakout detection.
//!
//! Two peaks of similar height bound a rounded trough (the cup); after the
//! right peak price drifts down a little (the handle) and then closes above
//! the right peak's high on a bullish bar (the breakout).
//!
//! The search is bounded: peaks come from a windowed local-maximum scan and
//! only pairs `min_cup_bars..=max_cup_bars` apart are considered, which keeps
//! the work close to linear in the series length.

use serde::{Deserialize, Serialize};

use super::{dedup_events, find_peaks, PatternEvent, PatternGeometry};
use crate::domain::Bar;

/// Geometry thresholds. Ratios are fractions (`0.12` = 12%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CupHandleParams {
    /// Bars on each side a peak must dominate.
    pub peak_window: usize,
    pub min_cup_bars: usize,
    pub max_cup_bars: usize,
    /// Max `|hL - hR| / max(hL, hR)`.
    pub peak_tolerance: f64,
    pub min_depth: f64,
    pub max_depth: f64,
    /// Bounds on `(bottom - left) / (right - left)`.
    pub min_bottom_pos: f64,
    pub max_bottom_pos: f64,
    pub max_handle_bars: usize,
    pub max_handle_pullback: f64,
    pub dedup_bars: usize,
    /// Shorter series are not scanned.
    pub min_bars: usize,
}

impl Default for CupHandleParams {
    fn default() -> Self {
        Self {
            peak_window: 5,
            min_cup_bars: 20,
            max_cup_bars: 150,
            peak_tolerance: 0.10,
            min_depth: 0.12,
            max_depth: 0.35,
            min_bottom_pos: 0.2,
            max_bottom_pos: 0.8,
            max_handle_bars: 25,
            max_handle_pullback: 0.12,
            dedup_bars: 5,
            min_bars: 30,
        }
    }
}

struct Cup {
    left: usize,
    right: usize,
    bottom: usize,
    rim: f64,
    depth: f64,
}

/// Breakout events for every qualifying cup, deduplicated.
pub fn detect_cup_with_handle(bars: &[Bar], params: &CupHandleParams) -> Vec<PatternEvent> {
    if bars.len() < params.min_bars.max(3) {
        return Vec::new();
    }

    let peaks = find_peaks(bars, params.peak_window);
    let mut events = Vec::new();

    for (a, &left) in peaks.iter().enumerate() {
        for &right in &peaks[a + 1..] {
            let span = right - left;
            if span < params.min_cup_bars {
                continue;
            }
            if span > params.max_cup_bars {
                break;
            }
            let Some(cup) = qualify_cup(bars, left, right, params) else {
                continue;
            };
            if let Some(event) = scan_handle(bars, &cup, params) {
                events.push(event);
            }
        }
    }

    dedup_events(events, params.dedup_bars)
}

fn qualify_cup(bars: &[Bar], left: usize, right: usize, params: &CupHandleParams) -> Option<Cup> {
    let (h_left, h_right) = (bars[left].high, bars[right].high);
    let taller = h_left.max(h_right);
    if taller <= 0.0 || (h_left - h_right).abs() / taller > params.peak_tolerance {
        return None;
    }

    let bottom = (left + 1..right)
        .filter(|&i| !bars[i].low.is_nan())
        .min_by(|&i, &j| bars[i].low.total_cmp(&bars[j].low))?;

    let rim = h_left.min(h_right);
    let depth = (rim - bars[bottom].low) / rim;
    if !(params.min_depth..=params.max_depth).contains(&depth) {
        return None;
    }

    let position = (bottom - left) as f64 / (right - left) as f64;
    if !(params.min_bottom_pos..=params.max_bottom_pos).contains(&position) {
        return None;
    }

    Some(Cup {
        left,
        right,
        bottom,
        rim,
        depth,
    })
}

/// Walk the handle window looking for the breakout bar.
fn scan_handle(bars: &[Bar], cup: &Cup, params: &CupHandleParams) -> Option<PatternEvent> {
    let h_right = bars[cup.right].high;
    let last = (cup.right + params.max_handle_bars).min(bars.len() - 1);
    let mut lowest = h_right;

    for j in cup.right + 1..=last {
        let bar = &bars[j];
        if bar.close > h_right && bar.is_bullish() {
            return Some(PatternEvent {
                index: j,
                date: bar.date,
                geometry: PatternGeometry::CupWithHandle {
                    left_peak: cup.left,
                    right_peak: cup.right,
                    bottom: cup.bottom,
                    rim: cup.rim,
                    cup_depth: cup.depth,
                    handle_low: lowest,
                    handle_pullback: (h_right - lowest) / h_right,
                },
            });
        }
        lowest = lowest.min(bar.low);
        if (h_right - lowest) / h_right > params.max_handle_pullback {
            return None;
        }
    }
    None
}
