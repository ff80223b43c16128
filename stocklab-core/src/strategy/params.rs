//! Parameter schemas, resolution and grid enumeration.
//!
//! `StrategyParams` is what callers pass (user input or a preset table row).
//! `ResolvedParams` is what strategies see: every schema key present, every
//! value inside its declared range. Uses `BTreeMap` for deterministic key
//! ordering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::StrategyError;

/// Caller-supplied parameter values, keyed by `ParamSpec::key`.
pub type StrategyParams = BTreeMap<String, f64>;

/// One tunable parameter of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl ParamSpec {
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Every grid value from `min` to `max` inclusive, `step` apart.
    ///
    /// Values are computed as `min + k * step` (not by accumulation) and
    /// rounded to 10 decimals so float drift cannot produce near-duplicates.
    pub fn grid_values(&self) -> Vec<f64> {
        if self.step <= 0.0 || self.max <= self.min {
            return vec![self.default];
        }
        let steps = ((self.max - self.min) / self.step + 1e-9).floor() as usize;
        (0..=steps)
            .map(|k| round10(self.min + k as f64 * self.step))
            .collect()
    }
}

fn round10(v: f64) -> f64 {
    (v * 1e10).round() / 1e10
}

/// Parameters after schema resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedParams(BTreeMap<String, f64>);

impl ResolvedParams {
    /// Value of a schema key. Resolution guarantees presence; a key outside
    /// the schema reads as NaN, which every strategy treats as "no signal".
    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(f64::NAN)
    }

    /// Integer-valued parameter (periods, bar counts, months), at least 1.
    pub fn period(&self, key: &str) -> usize {
        let v = self.get(key);
        if v.is_finite() {
            (v.round() as usize).max(1)
        } else {
            1
        }
    }

    /// Percentage parameter converted to a fraction (`3.0` → `0.03`).
    pub fn fraction(&self, key: &str) -> f64 {
        self.get(key) / 100.0
    }
}

/// A strategy's parameter schema, bound to the strategy id for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct ParamSchema<'a> {
    strategy: &'a str,
    specs: &'a [ParamSpec],
}

impl<'a> ParamSchema<'a> {
    pub fn new(strategy: &'a str, specs: &'a [ParamSpec]) -> Self {
        Self { strategy, specs }
    }

    pub fn specs(&self) -> &'a [ParamSpec] {
        self.specs
    }

    pub fn resolve(&self, params: &StrategyParams) -> Result<ResolvedParams, StrategyError> {
        resolve_params(self.strategy, self.specs, params)
    }

    pub fn defaults(&self) -> StrategyParams {
        default_params(self.specs)
    }

    pub fn grid(&self) -> Vec<StrategyParams> {
        param_grid(self.specs)
    }

    pub fn grid_size(&self) -> usize {
        grid_size(self.specs)
    }
}

/// Resolve caller params against a schema.
///
/// Missing keys take their default. Unknown keys and out-of-range values are
/// malformed-parameter errors.
pub fn resolve_params(
    strategy_id: &str,
    schema: &[ParamSpec],
    params: &StrategyParams,
) -> Result<ResolvedParams, StrategyError> {
    for key in params.keys() {
        if !schema.iter().any(|spec| spec.key == key) {
            return Err(StrategyError::UnknownParam {
                strategy: strategy_id.to_string(),
                key: key.clone(),
            });
        }
    }

    let mut resolved = BTreeMap::new();
    for spec in schema {
        let value = params.get(spec.key).copied().unwrap_or(spec.default);
        if !spec.contains(value) {
            return Err(StrategyError::OutOfRange {
                strategy: strategy_id.to_string(),
                key: spec.key.to_string(),
                value,
                min: spec.min,
                max: spec.max,
            });
        }
        resolved.insert(spec.key.to_string(), value);
    }
    Ok(ResolvedParams(resolved))
}

/// Default values for every key of a schema.
pub fn default_params(schema: &[ParamSpec]) -> StrategyParams {
    schema
        .iter()
        .map(|spec| (spec.key.to_string(), spec.default))
        .collect()
}

/// Cartesian product of every parameter's grid values.
///
/// Order is deterministic: schema order, ascending values, last key varying
/// fastest. An empty schema yields a single empty combination.
pub fn param_grid(schema: &[ParamSpec]) -> Vec<StrategyParams> {
    let mut combos: Vec<StrategyParams> = vec![BTreeMap::new()];
    for spec in schema {
        let values = spec.grid_values();
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for &v in &values {
                let mut c = combo.clone();
                c.insert(spec.key.to_string(), v);
                next.push(c);
            }
        }
        combos = next;
    }
    combos
}

/// Number of combinations `param_grid` would produce, without building them.
pub fn grid_size(schema: &[ParamSpec]) -> usize {
    schema
        .iter()
        .map(|spec| spec.grid_values().len())
        .product()
}
