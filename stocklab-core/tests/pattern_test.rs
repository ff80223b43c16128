//! Integration tests for the pattern detectors.
//!
//! Tests:
//! 1. A clean cup-with-handle yields exactly one breakout after dedup
//! 2. Overlapping candidates collapse to one event
//! 3. Gap-down reversals are found and merged by `detect_all`

use chrono::NaiveDate;
use stocklab_core::domain::Bar;
use stocklab_core::patterns::*;

/// Bars with high = close + 0.5, low = close - 0.5, open = close - 0.2.
fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open: close - 0.2,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 50_000,
        })
        .collect()
}

fn ramp(from: f64, to: f64, steps: usize) -> Vec<f64> {
    (1..=steps)
        .map(|k| from + (to - from) * k as f64 / steps as f64)
        .collect()
}

/// Left peak at 20 (high 110.5), cup bottom at 40 (low 84), right peak at 60
/// (high 105): 40 bars apart, ~5% height difference, 20% depth. The handle
/// dips to 100 and the breakout closes at 106 on bar 70.
fn cup_series() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..=20).map(|i| 80.0 + 1.5 * i as f64).collect();
    closes.extend(ramp(110.0, 84.5, 20));
    closes.extend(ramp(84.5, 104.5, 20));
    closes.extend(ramp(104.5, 100.0, 6));
    closes.extend((1..=9).map(|k| 100.0 + 1.5 * k as f64));
    closes
}

#[test]
fn clean_cup_with_handle_has_one_breakout() {
    let bars = bars_from_closes(&cup_series());
    let events = detect_cup_with_handle(&bars, &CupHandleParams::default());

    assert_eq!(events.len(), 1, "{events:?}");
    assert_eq!(events[0].index, 70);
    assert_eq!(events[0].date, bars[70].date);
    assert_eq!(events[0].kind(), PatternKind::CupWithHandle);
    let PatternGeometry::CupWithHandle {
        left_peak,
        right_peak,
        handle_pullback,
        ..
    } = events[0].geometry
    else {
        panic!("wrong geometry");
    };
    assert_eq!(right_peak - left_peak, 40);
    assert!(handle_pullback > 0.04 && handle_pullback < 0.06);
}

#[test]
fn flat_top_candidates_dedup_to_one_event() {
    // Duplicate the left peak bar so two adjacent peaks qualify.
    let mut closes = cup_series();
    closes.insert(20, 110.0);
    let bars = bars_from_closes(&closes);
    let events = detect_cup_with_handle(&bars, &CupHandleParams::default());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].index, 71);
}

#[test]
fn gap_down_reversal_merges_with_cups() {
    let mut closes = cup_series();
    let n = closes.len();
    closes.extend([113.0, 113.0]);
    let mut bars = bars_from_closes(&closes);
    // Gap the bar after the run-up down 4%, then close it back above.
    bars[n].open = 108.5;
    bars[n].low = 108.0;
    bars[n].close = 114.0;
    bars[n].high = 114.5;

    let events = detect_all(&bars);
    let kinds: Vec<(usize, PatternKind)> = events.iter().map(|e| (e.index, e.kind())).collect();
    assert_eq!(
        kinds,
        vec![(70, PatternKind::CupWithHandle), (n, PatternKind::GapDownReversal)]
    );
}

#[test]
fn short_or_empty_series_detect_nothing() {
    assert!(detect_all(&[]).is_empty());
    let bars = bars_from_closes(&[100.0; 10]);
    assert!(detect_cup_with_handle(&bars, &CupHandleParams::default()).is_empty());
}
