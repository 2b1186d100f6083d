//! Backtest runner — wires together loading, order generation, simulation and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: loads every input named by the config, then runs. Used by the CLI.
//! - `run_prepared()`: takes already-loaded data, no I/O. Used by sweeps.

use arblab_core::data::{DuplicatePolicy, PriceOracle, TradingCalendar};
use arblab_core::domain::{DatasetHash, Fill, Order, PriceRecord, RunId};
use arblab_core::engine::{simulate, OrderBook, ValuationTrace};
use arblab_core::SimError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{BacktestConfig, BacktestSection, ConfigError, StrategyConfig};
use crate::deals::Deal;
use crate::loader::{load_deals, load_orders, load_prices, LoadError};
use crate::metrics::PerformanceMetrics;
use crate::strategy::build_generator;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimError),
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: DatasetHash,
    pub params: BacktestSection,
    pub strategy: Option<StrategyConfig>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub metrics: PerformanceMetrics,
    pub final_cash: f64,
    pub orders: Vec<Order>,
    pub trace: ValuationTrace,
    /// Empty unless fills were recorded.
    #[serde(default)]
    pub fills: Vec<Fill>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// Short label for reports: the strategy name or `order_file`.
    pub fn source_label(&self) -> &'static str {
        match &self.strategy {
            Some(StrategyConfig::AnnounceToCompletion(_)) => "announce_to_completion",
            Some(StrategyConfig::PairArbitrage(_)) => "pair_arbitrage",
            None => "order_file",
        }
    }
}

/// Inputs loaded once and shared read-only by any number of runs.
#[derive(Debug)]
pub struct PreparedData {
    pub oracle: PriceOracle,
    pub calendar: TradingCalendar,
    pub deals: Vec<Deal>,
    /// Orders read from an order file, when the config names one.
    pub orders: Option<Vec<Order>>,
    pub dataset_hash: DatasetHash,
}

impl PreparedData {
    /// Load every input the config names and build the oracle and calendar.
    pub fn load(config: &BacktestConfig) -> Result<Self, RunError> {
        let shape = config.backtest.key_shape;
        let records = load_prices(&config.data.prices, shape)?;
        let deals = match &config.data.deals {
            Some(path) => load_deals(path)?,
            None => Vec::new(),
        };
        let orders = match &config.data.orders {
            Some(path) => Some(load_orders(path, shape)?),
            None => None,
        };
        Ok(Self::from_parts(
            &records,
            config.backtest.duplicate_policy,
            deals,
            orders,
        )?)
    }

    pub fn from_parts(
        records: &[PriceRecord],
        policy: DuplicatePolicy,
        deals: Vec<Deal>,
        orders: Option<Vec<Order>>,
    ) -> Result<Self, SimError> {
        let oracle = PriceOracle::build(records, policy)?;
        let calendar = oracle.calendar();
        let dataset_hash = oracle.dataset_hash();
        Ok(Self {
            oracle,
            calendar,
            deals,
            orders,
            dataset_hash,
        })
    }
}

/// The order schedule for `config`: the order file as loaded, or the
/// strategy's output over the prepared deals.
pub fn generate_orders(config: &BacktestConfig, data: &PreparedData) -> Vec<Order> {
    match (&config.strategy, &data.orders) {
        (Some(strategy), _) => build_generator(strategy, config.backtest.key_shape).generate(
            &data.deals,
            &data.oracle,
            &data.calendar,
        ),
        (None, Some(orders)) => orders.clone(),
        (None, None) => Vec::new(),
    }
}

/// Run a single backtest from a config (loads data from disk).
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let data = PreparedData::load(config)?;
    info!(
        prices = data.oracle.len(),
        sessions = data.calendar.len(),
        deals = data.deals.len(),
        dataset = %data.dataset_hash,
        "data loaded"
    );
    run_prepared(config, &data)
}

/// Run a backtest with pre-loaded data. No I/O.
pub fn run_prepared(
    config: &BacktestConfig,
    data: &PreparedData,
) -> Result<BacktestResult, RunError> {
    let orders = generate_orders(config, data);
    let book = OrderBook::new(orders.iter().cloned());
    let run_id = config.run_id(&data.dataset_hash);

    let output = simulate(&data.calendar, &data.oracle, &book, config.simulation_config())?;
    let metrics = PerformanceMetrics::compute(&output.trace, config.backtest.risk_free_rate);

    info!(
        run_id = %run_id,
        orders = orders.len(),
        final_value = metrics.final_value,
        sharpe = metrics.sharpe,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: data.dataset_hash.clone(),
        params: config.backtest.clone(),
        strategy: config.strategy.clone(),
        start_date: data.calendar.first(),
        end_date: data.calendar.last(),
        metrics,
        final_cash: output.final_cash,
        orders,
        trace: output.trace,
        fills: output.fills,
    })
}
