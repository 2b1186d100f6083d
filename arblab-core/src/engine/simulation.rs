//! Daily simulation loop.
//!
//! For each calendar date, in order:
//! 1. Resolve a price for every order scheduled on the date (a missing price is fatal)
//! 2. Apply the orders to the ledger, in book order
//! 3. Value the ledger at the date's prices and append a record to the trace
//!
//! A [`Simulation`] owns its ledger and trace. Calendar, oracle and order book
//! are borrowed read-only, so many simulations can share them across threads.

use crate::data::calendar::TradingCalendar;
use crate::data::oracle::PriceOracle;
use crate::domain::{Fill, InstrumentKey, Order};
use crate::engine::ledger::PositionLedger;
use crate::engine::order_book::OrderBook;
use crate::engine::trace::{ValuationRecord, ValuationTrace};
use crate::error::SimError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    /// Keep a [`Fill`] for every executed order.
    pub record_fills: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            record_fills: false,
        }
    }
}

impl SimulationConfig {
    pub fn with_capital(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    NotStarted,
    /// `next_index` is the calendar index of the next date to process.
    Running { next_index: usize },
    Completed,
    /// A fatal error stopped the run; no further steps are possible.
    Aborted,
}

/// Everything a finished (or stopped) simulation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub trace: ValuationTrace,
    /// Empty unless `record_fills` was set.
    pub fills: Vec<Fill>,
    pub final_cash: f64,
    #[serde(skip)]
    pub final_positions: BTreeMap<InstrumentKey, i64>,
}

pub struct Simulation<'a> {
    calendar: &'a TradingCalendar,
    oracle: &'a PriceOracle,
    book: &'a OrderBook,
    config: SimulationConfig,
    ledger: PositionLedger,
    trace: ValuationTrace,
    fills: Vec<Fill>,
    state: SimulationState,
}

impl<'a> Simulation<'a> {
    /// Prepare a run. Fails with `MissingPrice` if an order is dated off the
    /// calendar, since it could never be executed.
    pub fn new(
        calendar: &'a TradingCalendar,
        oracle: &'a PriceOracle,
        book: &'a OrderBook,
        config: SimulationConfig,
    ) -> Result<Self, SimError> {
        for date in book.dates() {
            if !calendar.contains(date) {
                if let Some(order) = book.orders_for(date).first() {
                    return Err(SimError::MissingPrice {
                        date,
                        key: order.key.clone(),
                    });
                }
            }
        }

        Ok(Self {
            calendar,
            oracle,
            book,
            ledger: PositionLedger::new(config.initial_capital),
            trace: ValuationTrace::with_capacity(calendar.len()),
            fills: Vec::new(),
            config,
            state: SimulationState::NotStarted,
        })
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Calendar index of the next date `step` will process.
    pub fn next_index(&self) -> usize {
        match self.state {
            SimulationState::NotStarted => 0,
            SimulationState::Running { next_index } => next_index,
            SimulationState::Completed => self.calendar.len(),
            SimulationState::Aborted => self.trace.len(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            SimulationState::Completed | SimulationState::Aborted
        )
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn trace(&self) -> &ValuationTrace {
        &self.trace
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Process one calendar date.
    ///
    /// Returns the record appended for the date, or `None` once every date has
    /// been processed (the simulation is then `Completed`). Stepping a
    /// completed simulation yields `SimulationFinished`; stepping an aborted
    /// one yields `SimulationAborted`.
    pub fn step(&mut self) -> Result<Option<&ValuationRecord>, SimError> {
        let index = match self.state {
            SimulationState::NotStarted => 0,
            SimulationState::Running { next_index } => next_index,
            SimulationState::Completed => return Err(SimError::SimulationFinished),
            SimulationState::Aborted => return Err(SimError::SimulationAborted),
        };

        let Some(date) = self.calendar.get(index) else {
            self.state = SimulationState::Completed;
            debug!(days = self.trace.len(), "simulation completed");
            return Ok(None);
        };

        // Every check runs before the ledger is touched, so a failing day
        // leaves no partial fills behind.
        let book = self.book;
        let oracle = self.oracle;
        let orders = book.orders_for(date);
        let prices = match self.resolve_day(date, orders) {
            Ok(prices) => prices,
            Err(err) => {
                self.state = SimulationState::Aborted;
                return Err(err);
            }
        };

        for (order, price) in orders.iter().zip(prices) {
            let fill = match self.ledger.apply(order, price) {
                Ok(fill) => fill,
                Err(err) => {
                    self.state = SimulationState::Aborted;
                    return Err(err);
                }
            };
            debug!(
                %date,
                key = %fill.key,
                quantity = fill.quantity,
                price = fill.price,
                cash = fill.cash_after,
                "order filled"
            );
            if self.config.record_fills {
                self.fills.push(fill);
            }
        }

        let valuation = self.ledger.value_at(date, oracle);
        for key in &valuation.unpriced {
            debug!(%date, %key, "held position has no price; valued at zero");
        }

        self.trace.push(ValuationRecord {
            date,
            value: valuation.total(),
            invested_capital: valuation.invested,
            cash: valuation.cash,
            gross_exposure: valuation.gross,
            holdings: self.ledger.snapshot(),
            unpriced: valuation.unpriced,
        });
        self.state = SimulationState::Running {
            next_index: index + 1,
        };

        Ok(self.trace.last())
    }

    /// Price every order for `date` and check that no position overflows.
    fn resolve_day(&self, date: NaiveDate, orders: &[Order]) -> Result<Vec<f64>, SimError> {
        let mut prices = Vec::with_capacity(orders.len());
        let mut projected: BTreeMap<&InstrumentKey, i64> = BTreeMap::new();
        for order in orders {
            prices.push(self.oracle.price(date, &order.key)?);

            let current = match projected.get(&order.key) {
                Some(&quantity) => quantity,
                None => self.ledger.position(&order.key),
            };
            let after = current
                .checked_add(order.quantity)
                .ok_or_else(|| SimError::MalformedInput {
                    reason: format!(
                        "position in {} overflows on {date} after trading {} shares",
                        order.key, order.quantity
                    ),
                })?;
            projected.insert(&order.key, after);
        }
        Ok(prices)
    }

    /// Step until every calendar date has been processed.
    pub fn run(mut self) -> Result<SimulationOutput, SimError> {
        match self.state {
            SimulationState::Completed => return Ok(self.into_output()),
            SimulationState::Aborted => return Err(SimError::SimulationAborted),
            _ => {}
        }
        while self.step()?.is_some() {}
        Ok(self.into_output())
    }

    /// Take whatever has been produced so far, finished or not.
    pub fn into_output(self) -> SimulationOutput {
        SimulationOutput {
            final_cash: self.ledger.cash(),
            final_positions: self.ledger.snapshot(),
            trace: self.trace,
            fills: self.fills,
        }
    }
}

/// Run a simulation from start to finish.
pub fn simulate(
    calendar: &TradingCalendar,
    oracle: &PriceOracle,
    book: &OrderBook,
    config: SimulationConfig,
) -> Result<SimulationOutput, SimError> {
    Simulation::new(calendar, oracle, book, config)?.run()
}
