//! Strategy catalogue — an explicitly constructed table of strategies.
//!
//! There is no global catalogue: callers build a registry (usually
//! `StrategyRegistry::standard()`) and pass it by reference.

use tracing::debug;

use super::{
    BollingerReversion, BuyAndHold, DipBuy, MaCross, MacdCross, PeriodicAccumulation,
    RsiReversal, Strategy, StrategyError, StrategyParams,
};
use crate::domain::{Bar, Signal};

pub struct StrategyRegistry {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// The built-in catalogue.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(BuyAndHold))
            .register(Box::new(MaCross))
            .register(Box::new(RsiReversal))
            .register(Box::new(MacdCross))
            .register(Box::new(BollingerReversion))
            .register(Box::new(DipBuy))
            .register(Box::new(PeriodicAccumulation));
        registry
    }

    /// Add a strategy, replacing any existing entry with the same id.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) -> &mut Self {
        if let Some(slot) = self.strategies.iter_mut().find(|s| s.id() == strategy.id()) {
            *slot = strategy;
        } else {
            self.strategies.push(strategy);
        }
        self
    }

    pub fn get(&self, id: &str) -> Result<&dyn Strategy, StrategyError> {
        self.strategies
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.as_ref())
            .ok_or_else(|| StrategyError::UnknownStrategy(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Strategy> {
        self.strategies.iter().map(|s| s.as_ref())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Look up a strategy, resolve `params`, and compute its signals.
    pub fn compute(
        &self,
        id: &str,
        bars: &[Bar],
        params: &StrategyParams,
    ) -> Result<Vec<Signal>, StrategyError> {
        let strategy = self.get(id)?;
        let resolved = strategy.resolve(params)?;
        let signals = strategy.compute(bars, &resolved);
        debug!(
            strategy = id,
            bars = bars.len(),
            buys = signals.iter().filter(|s| s.is_buy()).count(),
            sells = signals.iter().filter(|s| s.is_sell()).count(),
            "computed signals"
        );
        Ok(signals)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
