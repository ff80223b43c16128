//! Local-maximum detection over bar highs.

use crate::domain::Bar;

/// Indices of bars whose high is not exceeded by any bar within `window`
/// bars on either side (the window is clamped at the series edges).
///
/// Equal highs do not disqualify each other, so a flat top yields several
/// adjacent peaks; pattern dedup collapses whatever they produce. Void bars
/// are never peaks.
pub fn find_peaks(bars: &[Bar], window: usize) -> Vec<usize> {
    let n = bars.len();
    (0..n)
        .filter(|&i| {
            let high = bars[i].high;
            if high.is_nan() {
                return false;
            }
            let lo = i.saturating_sub(window);
            let hi = (i + window).min(n - 1);
            bars[lo..=hi].iter().all(|b| b.high <= high || b.high.is_nan())
        })
        .collect()
}
