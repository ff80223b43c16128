//! Look-ahead contamination tests for indicators and strategies.
//!
//! Invariant: no value (or signal) at bar t may depend on bar t+1 or later.
//!
//! Method: compute on a truncated series and on the full series and assert
//! the overlapping prefix is identical.

use chrono::NaiveDate;
use stocklab_core::domain::Bar;
use stocklab_core::indicators::*;
use stocklab_core::strategy::{StrategyParams, StrategyRegistry};

/// Generate N bars of synthetic OHLCV data with realistic variation.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        // Deterministic pseudo-random walk using a simple LCG
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.05; // -5.0 to +5.0
        price += change;
        price = price.max(10.0);

        let open = price - 0.5;
        let close = price + 0.3;
        bars.push(Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high: open.max(close) + 2.0,
            low: open.min(close) - 2.0,
            close,
            volume: 1000 + (i as u64 * 100),
        });
    }

    bars
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let truncated_result = indicator.compute(&full_bars[..truncated_len]);
    let full_result = indicator.compute(full_bars);

    assert_eq!(truncated_result.len(), truncated_len, "{}", indicator.name());
    assert_eq!(full_result.len(), full_bars.len(), "{}", indicator.name());

    for i in 0..truncated_len {
        let (t, f) = (truncated_result[i], full_result[i]);
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{}: NaN mismatch at bar {i} (truncated={t}, full={f})",
            indicator.name()
        );
        assert!(
            (t - f).abs() < 1e-10,
            "{}: look-ahead contamination at bar {i}: truncated={t}, full={f}",
            indicator.name()
        );
    }
}

#[test]
fn lookahead_sma() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Sma::new(5), &bars, 100);
    assert_no_lookahead(&Sma::new(25), &bars, 100);
}

#[test]
fn lookahead_ema() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Ema::new(12), &bars, 100);
    assert_no_lookahead(&Ema::new(26), &bars, 100);
}

#[test]
fn lookahead_rsi() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Rsi::new(14), &bars, 100);
    assert_no_lookahead(&Rsi::new(5), &bars, 100);
}

#[test]
fn lookahead_bollinger() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Bollinger::upper(20, 2.0), &bars, 100);
    assert_no_lookahead(&Bollinger::middle(20, 2.0), &bars, 100);
    assert_no_lookahead(&Bollinger::lower(20, 2.0), &bars, 100);
}

#[test]
fn lookahead_macd() {
    let bars = make_test_bars(200);
    for line in [MacdLine::Macd, MacdLine::Signal, MacdLine::Histogram] {
        assert_no_lookahead(&Macd::new(12, 26, 9, line), &bars, 100);
    }
}

#[test]
fn indicator_warmup_matches_lookback() {
    let bars = make_test_bars(120);
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Sma::new(20)),
        Box::new(Ema::new(20)),
        Box::new(Rsi::new(14)),
        Box::new(Bollinger::lower(20, 2.0)),
        Box::new(Macd::new(12, 26, 9, MacdLine::Histogram)),
    ];
    for indicator in &indicators {
        let values = indicator.compute(&bars);
        let lookback = indicator.lookback();
        assert!(
            values[..lookback].iter().all(|v| v.is_nan()),
            "{}: value before lookback",
            indicator.name()
        );
        assert!(
            !values[lookback].is_nan(),
            "{}: NaN at lookback index {lookback}",
            indicator.name()
        );
    }
}

#[test]
fn strategy_signals_are_prefix_stable() {
    let registry = StrategyRegistry::standard();
    let bars = make_test_bars(250);
    for id in registry.ids() {
        let full = registry.compute(id, &bars, &StrategyParams::new()).unwrap();
        for cut in [60, 120, 200] {
            let truncated = registry
                .compute(id, &bars[..cut], &StrategyParams::new())
                .unwrap();
            assert_eq!(truncated.len(), cut);
            assert_eq!(
                truncated[..],
                full[..cut],
                "{id}: signals before bar {cut} changed when later bars were added"
            );
        }
    }
}
