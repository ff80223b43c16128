//! Per-bar portfolio snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Portfolio state at a bar's close.
///
/// Invariant: `equity == cash + position`; `drawdown` is in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    /// Market value of the held shares at the bar's close.
    pub position: f64,
    /// `(peak_equity - equity) / peak_equity`.
    pub drawdown: f64,
}
