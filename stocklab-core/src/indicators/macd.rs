//! Moving Average Convergence/Divergence (MACD).
//!
//! - MACD line: EMA(short) - EMA(long)
//! - Signal line: EMA(signal) of the MACD line
//! - Histogram: MACD line - signal line
//!
//! MACD line lookback: long - 1. Signal line lookback: long + signal - 2.

use super::ema::ema_of_series;
use super::{closes, Indicator};
use crate::domain::Bar;

/// Which MACD output an `Indicator` instance reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Macd,
    Signal,
    Histogram,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Macd {
    short: usize,
    long: usize,
    signal: usize,
    line: MacdLine,
    name: String,
}

impl Macd {
    pub fn new(short: usize, long: usize, signal: usize, line: MacdLine) -> Self {
        assert!(short >= 1, "MACD short period must be >= 1");
        assert!(long > short, "MACD long period must be > short period");
        assert!(signal >= 1, "MACD signal period must be >= 1");
        let label = match line {
            MacdLine::Macd => "line",
            MacdLine::Signal => "signal",
            MacdLine::Histogram => "hist",
        };
        Self {
            short,
            long,
            signal,
            line,
            name: format!("macd_{label}_{short}_{long}_{signal}"),
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.line {
            MacdLine::Macd => self.long - 1,
            MacdLine::Signal | MacdLine::Histogram => self.long + self.signal - 2,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let series = macd_of_series(&closes(bars), self.short, self.long, self.signal);
        match self.line {
            MacdLine::Macd => series.macd,
            MacdLine::Signal => series.signal,
            MacdLine::Histogram => series.histogram,
        }
    }
}

/// MACD of an arbitrary series.
pub fn macd_of_series(values: &[f64], short: usize, long: usize, signal: usize) -> MacdSeries {
    let short_ema = ema_of_series(values, short);
    let long_ema = ema_of_series(values, long);

    let macd: Vec<f64> = short_ema
        .iter()
        .zip(&long_ema)
        .map(|(s, l)| s - l) // NaN - x stays NaN
        .collect();
    let signal_line = ema_of_series(&macd, signal);
    let histogram = macd.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    MacdSeries {
        macd,
        signal: signal_line,
        histogram,
    }
}
