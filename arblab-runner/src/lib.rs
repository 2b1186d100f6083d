//! ArbLab Runner — data loading, order generation, backtest orchestration, metrics.
//!
//! This crate builds on `arblab-core` to provide:
//! - CSV loaders for prices, orders and the deal sheet
//! - Order generators driven by deal events (announce-to-completion, pair arbitrage)
//! - Implied completion probability from deal terms
//! - Single-backtest runner with metrics and run fingerprinting
//! - Parallel parameter sweeps
//! - CSV / JSON / HTML export

pub mod config;
pub mod deals;
pub mod export;
pub mod loader;
pub mod metrics;
pub mod probability;
pub mod runner;
pub mod strategy;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError, ExportFormat, StrategyConfig};
pub use deals::Deal;
pub use loader::{load_deals, load_orders, load_prices, LoadError};
pub use metrics::PerformanceMetrics;
pub use runner::{
    generate_orders, run_backtest, run_prepared, BacktestResult, PreparedData, RunError,
    SCHEMA_VERSION,
};
pub use strategy::{build_generator, OrderGenerator};
pub use sweep::{ParamSweep, SweepGrid, SweepResults};
