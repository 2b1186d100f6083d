//! Order generation — turns a deal calendar into a schedule of orders.
//!
//! Generators see deals, prices and the trading calendar, never the ledger:
//! the whole order schedule is fixed before the simulation starts.

pub mod announce;
pub mod pair;

use arblab_core::data::{PriceOracle, TradingCalendar};
use arblab_core::domain::{KeyShape, Order};

use crate::config::StrategyConfig;
use crate::deals::Deal;

pub use announce::{AnnounceParams, AnnounceToCompletion};
pub use pair::{PairArbitrage, PairParams};

/// Trait for order generators.
pub trait OrderGenerator: Send + Sync {
    /// Human-readable name (e.g., "announce_to_completion").
    fn name(&self) -> &'static str;

    /// Orders for every eligible deal, sorted by date. Orders sharing a date
    /// keep the order in which they were generated.
    fn generate(
        &self,
        deals: &[Deal],
        oracle: &PriceOracle,
        calendar: &TradingCalendar,
    ) -> Vec<Order>;
}

/// Build the generator a config describes.
pub fn build_generator(config: &StrategyConfig, key_shape: KeyShape) -> Box<dyn OrderGenerator> {
    match config {
        StrategyConfig::AnnounceToCompletion(params) => {
            Box::new(AnnounceToCompletion::new(params.clone(), key_shape))
        }
        StrategyConfig::PairArbitrage(params) => Box::new(PairArbitrage::new(params.clone())),
    }
}

/// `"any"` disables a text filter; otherwise values must match after trimming.
pub(crate) fn filter_matches(filter: &str, value: &str) -> bool {
    filter.trim().eq_ignore_ascii_case("any") || filter.trim() == value.trim()
}

pub(crate) fn sort_by_date(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by_key(|o| o.date);
    orders
}
