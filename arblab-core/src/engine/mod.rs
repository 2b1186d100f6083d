//! Simulation engine — order book, position ledger, daily loop and valuation trace.
//!
//! The loop visits every calendar date once: orders for the date are filled
//! at the oracle's price, then the ledger is marked to market and the result
//! is appended to the trace.

pub mod ledger;
pub mod order_book;
pub mod simulation;
pub mod trace;

pub use ledger::{PositionLedger, Valuation};
pub use order_book::OrderBook;
pub use simulation::{
    simulate, Simulation, SimulationConfig, SimulationOutput, SimulationState,
    DEFAULT_INITIAL_CAPITAL,
};
pub use trace::{ValuationRecord, ValuationTrace};
