//! Market data structures: trading calendar and price oracle

pub mod calendar;
pub mod oracle;

pub use calendar::TradingCalendar;
pub use oracle::{DuplicatePolicy, PriceOracle};
