//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol on a single period.
///
/// Series of bars are ordered ascending by date and the index position is
/// meaningful: lookback windows are counted in bars, not in calendar days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// A bar the surrounding data client would accept: finite, non-zero open and close.
    pub fn is_tradable(&self) -> bool {
        self.open.is_finite() && self.close.is_finite() && self.open != 0.0 && self.close != 0.0
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// A bullish bar closes above its own open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Bar interval of a price series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    #[default]
    Daily,
    Weekly,
}

impl PeriodType {
    /// Trailing calendar-day window used when listing recent entry signals.
    pub fn recent_signal_days(&self) -> i64 {
        match self {
            PeriodType::Daily => 7,
            PeriodType::Weekly => 28,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
        }
    }
}

impl std::str::FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "1d" | "d" => Ok(PeriodType::Daily),
            "weekly" | "1wk" | "w" => Ok(PeriodType::Weekly),
            other => Err(format!("unknown period type: {other}")),
        }
    }
}
