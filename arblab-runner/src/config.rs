//! Serializable run configuration (TOML).
//!
//! ```toml
//! [backtest]
//! initial_capital = 1000000.0
//! key_shape = "single"
//! duplicate_policy = "average"
//!
//! [data]
//! prices = "price.csv"
//! deals = "deals.csv"
//!
//! [strategy]
//! type = "announce_to_completion"
//! shares_on_announce = 100
//! ```

use std::path::{Path, PathBuf};

use arblab_core::data::DuplicatePolicy;
use arblab_core::domain::{DatasetHash, KeyShape, RunId};
use arblab_core::engine::{SimulationConfig, DEFAULT_INITIAL_CAPITAL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::{AnnounceParams, PairParams};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Validation(String),
}

/// Complete description of one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    pub data: DataSection,
    #[serde(default)]
    pub strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub initial_capital: f64,
    pub key_shape: KeyShape,
    pub duplicate_policy: DuplicatePolicy,
    pub record_fills: bool,
    /// Annual rate used for Sharpe and Sortino.
    pub risk_free_rate: f64,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            key_shape: KeyShape::Single,
            duplicate_policy: DuplicatePolicy::Average,
            record_fills: false,
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub prices: PathBuf,
    #[serde(default)]
    pub orders: Option<PathBuf>,
    #[serde(default)]
    pub deals: Option<PathBuf>,
}

/// Which order generator to run, with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    AnnounceToCompletion(AnnounceParams),
    PairArbitrage(PairParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Html,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
    pub formats: Vec<ExportFormat>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            formats: vec![ExportFormat::Csv, ExportFormat::Json],
        }
    }
}

impl BacktestConfig {
    /// Minimal config: replay an order file against a price file.
    pub fn from_order_file(prices: impl Into<PathBuf>, orders: impl Into<PathBuf>) -> Self {
        Self {
            backtest: BacktestSection::default(),
            data: DataSection {
                prices: prices.into(),
                orders: Some(orders.into()),
                deals: None,
            },
            strategy: None,
            output: OutputSection::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load, validate, and resolve data paths relative to the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Make relative data and output paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.data.prices);
        if let Some(orders) = self.data.orders.as_mut() {
            rebase(orders);
        }
        if let Some(deals) = self.data.deals.as_mut() {
            rebase(deals);
        }
        rebase(&mut self.output.dir);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        let capital = self.backtest.initial_capital;
        if !capital.is_finite() || capital <= 0.0 {
            return invalid(format!("initial_capital must be finite and > 0, got {capital}"));
        }
        if !self.backtest.risk_free_rate.is_finite() {
            return invalid("risk_free_rate must be finite".into());
        }

        match (&self.data.orders, &self.strategy) {
            (Some(_), Some(_)) => {
                return invalid("set either data.orders or [strategy], not both".into())
            }
            (None, None) => return invalid("no order source: set data.orders or [strategy]".into()),
            (None, Some(_)) if self.data.deals.is_none() => {
                return invalid("[strategy] needs data.deals".into())
            }
            _ => {}
        }

        match &self.strategy {
            Some(StrategyConfig::AnnounceToCompletion(p)) => {
                if p.shares_on_announce <= 0 {
                    return invalid("shares_on_announce must be > 0".into());
                }
                if p.exit_offset == 0 {
                    return invalid("exit_offset must be at least 1 session".into());
                }
                if let Some(min) = p.min_probability {
                    if !(0.0..=1.0).contains(&min) {
                        return invalid(format!("min_probability must be in [0, 1], got {min}"));
                    }
                }
                if p.fallback_window == 0 {
                    return invalid("fallback_window must be > 0".into());
                }
            }
            Some(StrategyConfig::PairArbitrage(p)) => {
                if !p.capital_each_side.is_finite() || p.capital_each_side <= 0.0 {
                    return invalid("capital_each_side must be finite and > 0".into());
                }
                if self.backtest.key_shape != KeyShape::Composite {
                    return invalid("pair_arbitrage needs key_shape = \"composite\"".into());
                }
            }
            None => {}
        }
        Ok(())
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            initial_capital: self.backtest.initial_capital,
            record_fills: self.backtest.record_fills,
        }
    }

    /// Deterministic id over the parameters that shape the result and the data they ran on.
    ///
    /// Input paths and output settings are excluded: moving a file does not change the run.
    pub fn run_id(&self, dataset_hash: &DatasetHash) -> RunId {
        let params = serde_json::json!({
            "backtest": &self.backtest,
            "strategy": &self.strategy,
            "orders": self.data.orders.is_some(),
        });
        RunId::derive(&params, dataset_hash)
    }
}
