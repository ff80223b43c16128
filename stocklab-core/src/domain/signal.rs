//! Per-bar trading signal.

use serde::{Deserialize, Serialize};

/// Directional intent for one bar.
///
/// A signal sequence always has the same length as the bar series it was
/// computed from, with 1:1 index correspondence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    pub fn is_buy(&self) -> bool {
        matches!(self, Signal::Buy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Signal::Sell)
    }

    /// An all-hold sequence of length `n` (the short-history answer).
    pub fn all_hold(n: usize) -> Vec<Signal> {
        vec![Signal::Hold; n]
    }
}
