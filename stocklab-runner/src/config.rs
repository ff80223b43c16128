//! Runner configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! initial_capital = 1000000.0
//! fixed_amount = 100000.0
//! workers = 4
//! ranking_metric = "sharpe"
//! period_type = "daily"
//! max_combinations = 500
//! seed = 42
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocklab_core::domain::PeriodType;
use stocklab_core::engine::{BacktestConfig, EngineError};

use crate::ranking::RankingMetric;

/// Errors from loading or validating a [`RunnerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] EngineError),
    #[error("invalid config: workers must be at least 1")]
    NoWorkers,
}

/// Settings shared by sweeps, walk-forward runs and single backtests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub initial_capital: f64,
    /// Per-signal buy amount for fixed-amount strategies.
    pub fixed_amount: f64,
    /// Worker threads for sweeps and in-sample optimization.
    pub workers: usize,
    pub ranking_metric: RankingMetric,
    pub period_type: PeriodType,
    /// Grids larger than this are randomly subsampled.
    pub max_combinations: usize,
    /// Seed for grid subsampling.
    pub seed: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let engine = BacktestConfig::default();
        Self {
            initial_capital: engine.initial_capital,
            fixed_amount: engine.fixed_amount,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            ranking_metric: RankingMetric::default(),
            period_type: PeriodType::default(),
            max_combinations: 500,
            seed: 42,
        }
    }
}

impl RunnerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.backtest_config().validate()?;
        Ok(())
    }

    /// The engine-facing subset of this configuration.
    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig::new(self.initial_capital, self.fixed_amount)
    }
}
