//! Optimized parameter presets keyed by `(strategy, preset name, period type)`.
//!
//! Tables are TOML arrays of `[[preset]]` entries. A user table can be
//! layered over the built-in one with [`PresetTable::merge`]; later entries
//! shadow earlier ones with the same key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocklab_core::domain::PeriodType;
use stocklab_core::strategy::{StrategyError, StrategyParams, StrategyRegistry};

const BUILTIN_PRESETS: &str = include_str!("../presets/builtin.toml");

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("failed to read presets {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid preset TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("preset {strategy}/{name} ({period_type}): {source}")]
    Invalid {
        strategy: String,
        name: String,
        period_type: &'static str,
        #[source]
        source: StrategyError,
    },
    #[error("no preset {strategy}/{name} for {period_type} bars")]
    NotFound {
        strategy: String,
        name: String,
        period_type: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub strategy: String,
    pub name: String,
    #[serde(default)]
    pub period_type: PeriodType,
    #[serde(default)]
    pub params: StrategyParams,
}

impl Preset {
    fn matches(&self, strategy: &str, name: &str, period_type: PeriodType) -> bool {
        self.strategy == strategy && self.name == name && self.period_type == period_type
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFile {
    #[serde(default, rename = "preset")]
    presets: Vec<Preset>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetTable {
    presets: Vec<Preset>,
}

impl PresetTable {
    pub fn from_toml_str(s: &str) -> Result<Self, PresetError> {
        let file: PresetFile = toml::from_str(s)?;
        Ok(Self {
            presets: file.presets,
        })
    }

    pub fn load(path: &Path) -> Result<Self, PresetError> {
        let text = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, PresetError> {
        Self::from_toml_str(BUILTIN_PRESETS)
    }

    /// Append `other`; its entries shadow existing ones with the same key.
    pub fn merge(&mut self, other: PresetTable) {
        self.presets.extend(other.presets);
    }

    pub fn get(
        &self,
        strategy: &str,
        name: &str,
        period_type: PeriodType,
    ) -> Option<&StrategyParams> {
        self.presets
            .iter()
            .rev()
            .find(|p| p.matches(strategy, name, period_type))
            .map(|p| &p.params)
    }

    /// Like [`get`](Self::get), with a descriptive error on a miss.
    pub fn require(
        &self,
        strategy: &str,
        name: &str,
        period_type: PeriodType,
    ) -> Result<&StrategyParams, PresetError> {
        self.get(strategy, name, period_type)
            .ok_or_else(|| PresetError::NotFound {
                strategy: strategy.to_string(),
                name: name.to_string(),
                period_type: period_type.as_str(),
            })
    }

    /// Distinct preset names for a strategy at one interval, in table order.
    pub fn names(&self, strategy: &str, period_type: PeriodType) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for preset in &self.presets {
            if preset.strategy == strategy
                && preset.period_type == period_type
                && !names.contains(&preset.name.as_str())
            {
                names.push(&preset.name);
            }
        }
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Check every preset resolves against its strategy's schema.
    pub fn validate(&self, registry: &StrategyRegistry) -> Result<(), PresetError> {
        for preset in &self.presets {
            let invalid = |source| PresetError::Invalid {
                strategy: preset.strategy.clone(),
                name: preset.name.clone(),
                period_type: preset.period_type.as_str(),
                source,
            };
            let strategy = registry.get(&preset.strategy).map_err(invalid)?;
            strategy.resolve(&preset.params).map_err(invalid)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_parses_and_validates() {
        let table = PresetTable::builtin().unwrap();
        assert!(!table.is_empty());
        table.validate(&StrategyRegistry::standard()).unwrap();
    }

    #[test]
    fn builtin_covers_every_parameterized_strategy_daily() {
        let table = PresetTable::builtin().unwrap();
        let registry = StrategyRegistry::standard();
        for strategy in registry.iter() {
            if strategy.param_schema().is_empty() {
                continue;
            }
            assert!(
                !table.names(strategy.id(), PeriodType::Daily).is_empty(),
                "no daily preset for {}",
                strategy.id()
            );
        }
    }

    #[test]
    fn lookup_is_keyed_by_period_type() {
        let table = PresetTable::builtin().unwrap();
        let daily = table.get("ma_cross", "fast", PeriodType::Daily).unwrap();
        let weekly = table.get("ma_cross", "fast", PeriodType::Weekly).unwrap();
        assert_eq!(daily["long"], 20.0);
        assert_eq!(weekly["long"], 13.0);
        assert!(table.get("ma_cross", "missing", PeriodType::Daily).is_none());
    }

    #[test]
    fn require_reports_missing_key() {
        let table = PresetTable::default();
        let err = table.require("ma_cross", "fast", PeriodType::Weekly).unwrap_err();
        assert_eq!(err.to_string(), "no preset ma_cross/fast for weekly bars");
    }

    #[test]
    fn merged_entries_shadow_builtin() {
        let mut table = PresetTable::builtin().unwrap();
        let user = PresetTable::from_toml_str(
            r#"
            [[preset]]
            strategy = "ma_cross"
            name = "fast"
            params = { short = 3, long = 10 }
            "#,
        )
        .unwrap();
        table.merge(user);
        let params = table.get("ma_cross", "fast", PeriodType::Daily).unwrap();
        assert_eq!(params["short"], 3.0);
        assert_eq!(table.names("ma_cross", PeriodType::Daily), vec!["fast", "slow"]);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let table = PresetTable::from_toml_str(
            r#"
            [[preset]]
            strategy = "rsi_reversal"
            name = "broken"
            params = { period = 500 }
            "#,
        )
        .unwrap();
        let err = table.validate(&StrategyRegistry::standard()).unwrap_err();
        assert!(matches!(
            err,
            PresetError::Invalid {
                source: StrategyError::OutOfRange { .. },
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_unknown_strategy() {
        let table = PresetTable::from_toml_str(
            "[[preset]]\nstrategy = \"nope\"\nname = \"x\"\n",
        )
        .unwrap();
        assert!(table.validate(&StrategyRegistry::standard()).is_err());
    }
}
