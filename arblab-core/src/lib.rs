//! ArbLab Core — deterministic daily portfolio simulation.
//!
//! This crate contains:
//! - Domain types (instrument keys, orders, fills, price records, ids)
//! - Trading calendar and price oracle built from price records
//! - Order book, position ledger and the daily simulation loop
//! - The valuation trace consumed by statistics and export

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;

pub use error::SimError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: shared inputs and run outputs are Send + Sync,
    /// so sweeps can share one oracle across worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::InstrumentKey>();
        require_sync::<domain::InstrumentKey>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Fill>();
        require_sync::<domain::Fill>();

        require_send::<data::TradingCalendar>();
        require_sync::<data::TradingCalendar>();
        require_send::<data::PriceOracle>();
        require_sync::<data::PriceOracle>();

        require_send::<engine::OrderBook>();
        require_sync::<engine::OrderBook>();
        require_send::<engine::SimulationOutput>();
        require_sync::<engine::SimulationOutput>();
        require_send::<engine::Simulation<'static>>();

        require_send::<SimError>();
        require_sync::<SimError>();
    }
}
