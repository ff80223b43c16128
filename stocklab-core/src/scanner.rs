//! Active-position and recent-signal scanner.
//!
//! Answers two watchlist questions from a signal sequence: "am I in a
//! position right now, and since when?" and "did anything fire lately?".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, PeriodType, Signal};

/// The open position implied by a signal sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePosition {
    pub buy_index: usize,
    pub buy_date: NaiveDate,
    /// Close of the buy bar.
    pub buy_price: f64,
}

/// A buy signal inside the recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSignal {
    pub index: usize,
    pub date: NaiveDate,
    pub close: f64,
    /// Calendar days between this signal and the last bar.
    pub days_ago: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub period_type: PeriodType,
    pub active_position: Option<ActivePosition>,
    /// Most recent first.
    pub recent_signals: Vec<RecentSignal>,
}

/// The last buy not followed by a sell, if any.
///
/// Each buy replaces the open position and each sell clears it, so with
/// repeated buys the latest one wins.
pub fn active_position(bars: &[Bar], signals: &[Signal]) -> Option<ActivePosition> {
    let mut open = None;
    for (i, (bar, signal)) in bars.iter().zip(signals).enumerate() {
        match signal {
            Signal::Buy => {
                open = Some(ActivePosition {
                    buy_index: i,
                    buy_date: bar.date,
                    buy_price: bar.close,
                })
            }
            Signal::Sell => open = None,
            Signal::Hold => {}
        }
    }
    open
}

/// Buy signals within the period type's trailing calendar window.
pub fn recent_signals(
    bars: &[Bar],
    signals: &[Signal],
    period_type: PeriodType,
) -> Vec<RecentSignal> {
    recent_signals_within(bars, signals, period_type.recent_signal_days())
}

/// Buy signals dated no more than `days` calendar days before the last bar,
/// most recent first.
pub fn recent_signals_within(bars: &[Bar], signals: &[Signal], days: i64) -> Vec<RecentSignal> {
    let Some(last) = bars.last() else {
        return Vec::new();
    };
    bars.iter()
        .zip(signals)
        .enumerate()
        .rev()
        .filter(|(_, (_, signal))| signal.is_buy())
        .map(|(i, (bar, _))| RecentSignal {
            index: i,
            date: bar.date,
            close: bar.close,
            days_ago: (last.date - bar.date).num_days(),
        })
        .take_while(|s| s.days_ago <= days)
        .collect()
}

pub fn scan(bars: &[Bar], signals: &[Signal], period_type: PeriodType) -> ScanResult {
    ScanResult {
        period_type,
        active_position: active_position(bars, signals),
        recent_signals: recent_signals(bars, signals, period_type),
    }
}
