//! Orders and fills.

use super::key::InstrumentKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A scheduled trade: fill `quantity` shares of `key` on `date`.
///
/// Positive quantity buys, negative quantity sells (or shorts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub date: NaiveDate,
    pub key: InstrumentKey,
    pub quantity: i64,
}

impl Order {
    pub fn new(date: NaiveDate, key: InstrumentKey, quantity: i64) -> Self {
        Self { date, key, quantity }
    }

    pub fn is_buy(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_sell(&self) -> bool {
        self.quantity < 0
    }

    /// Cash effect of filling this order at `price` (negative for buys).
    pub fn cash_delta(&self, price: f64) -> f64 {
        -(price * self.quantity as f64)
    }
}

/// One executed order, as recorded in the optional fill log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub date: NaiveDate,
    pub key: InstrumentKey,
    pub quantity: i64,
    pub price: f64,
    /// `price × quantity`; positive for buys.
    pub notional: f64,
    /// Ledger quantity for `key` after this fill.
    pub position_after: i64,
    /// Cash after this fill.
    pub cash_after: f64,
}
