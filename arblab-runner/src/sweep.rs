//! Parameter sweeps over a base config.
//!
//! Data is loaded once into a [`PreparedData`] and shared read-only; every
//! grid point generates its own orders and owns its own simulation, so the
//! parallel and sequential paths give identical results.

use rayon::prelude::*;
use std::collections::HashMap;
use tracing::info;

use crate::config::{BacktestConfig, StrategyConfig};
use crate::runner::{run_prepared, BacktestResult, PreparedData, RunError};

/// Parameter grid: each axis lists the values to try.
///
/// An empty axis keeps the base config's value for that parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepGrid {
    pub initial_capitals: Vec<f64>,
    /// Announce-to-completion only.
    pub shares_on_announce: Vec<i64>,
    /// Announce-to-completion only.
    pub exit_offsets: Vec<usize>,
    /// Pair arbitrage only.
    pub capital_each_side: Vec<f64>,
}

/// `axis` if non-empty, otherwise the single `base` value.
fn axis_or<T: Clone>(axis: &[T], base: T) -> Vec<T> {
    if axis.is_empty() {
        vec![base]
    } else {
        axis.to_vec()
    }
}

impl SweepGrid {
    /// Every config in the grid, in a fixed order. Axes that do not apply to
    /// the base strategy are ignored.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::new();
        for capital in axis_or(&self.initial_capitals, base.backtest.initial_capital) {
            let mut with_capital = base.clone();
            with_capital.backtest.initial_capital = capital;

            match &base.strategy {
                Some(StrategyConfig::AnnounceToCompletion(params)) => {
                    for shares in axis_or(&self.shares_on_announce, params.shares_on_announce) {
                        for offset in axis_or(&self.exit_offsets, params.exit_offset) {
                            let mut p = params.clone();
                            p.shares_on_announce = shares;
                            p.exit_offset = offset;
                            let mut config = with_capital.clone();
                            config.strategy = Some(StrategyConfig::AnnounceToCompletion(p));
                            configs.push(config);
                        }
                    }
                }
                Some(StrategyConfig::PairArbitrage(params)) => {
                    for each_side in axis_or(&self.capital_each_side, params.capital_each_side) {
                        let mut p = params.clone();
                        p.capital_each_side = each_side;
                        let mut config = with_capital.clone();
                        config.strategy = Some(StrategyConfig::PairArbitrage(p));
                        configs.push(config);
                    }
                }
                None => configs.push(with_capital),
            }
        }
        configs
    }

    pub fn size(&self, base: &BacktestConfig) -> usize {
        self.generate_configs(base).len()
    }
}

/// Parameter sweep executor.
///
/// Runs backtests for all configurations in a grid, optionally in parallel.
pub struct ParamSweep<'a> {
    data: &'a PreparedData,
    parallel: bool,
}

impl<'a> ParamSweep<'a> {
    pub fn new(data: &'a PreparedData) -> Self {
        Self {
            data,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every grid point. Any invalid config or failed run fails the sweep.
    pub fn sweep(&self, grid: &SweepGrid, base: &BacktestConfig) -> Result<SweepResults, RunError> {
        let configs = grid.generate_configs(base);
        for config in &configs {
            config.validate()?;
        }
        info!(points = configs.len(), parallel = self.parallel, "starting sweep");

        let results: Vec<BacktestResult> = if self.parallel {
            configs
                .par_iter()
                .map(|config| run_prepared(config, self.data))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .map(|config| run_prepared(config, self.data))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults::new(results))
    }
}

/// Results from a parameter sweep, sorted by Sharpe ratio (descending).
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(mut results: Vec<BacktestResult>) -> Self {
        // Stable: ties keep grid order.
        results.sort_by(|a, b| b.metrics.sharpe.total_cmp(&a.metrics.sharpe));
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.to_string(), i))
            .collect();
        Self { results, by_run_id }
    }

    /// All results, best first.
    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.results.first()
    }

    pub fn top_n(&self, n: usize) -> &[BacktestResult] {
        &self.results[..n.min(self.results.len())]
    }
}
