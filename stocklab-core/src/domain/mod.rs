//! Domain types shared by every component of the simulation core.

pub mod bar;
pub mod equity;
pub mod float_serde;
pub mod signal;
pub mod trade;

pub use bar::{Bar, PeriodType};
pub use equity::EquityPoint;
pub use signal::Signal;
pub use trade::{RoundTrip, Trade, TradeSide};
