//! Position ledger — per-key signed share counts plus one cash balance.
//!
//! Entries are created on first trade and never removed; zero quantities are
//! only filtered out of snapshots. Entries live in a `BTreeMap` so valuation
//! sums always run in the same key order.

use crate::data::oracle::PriceOracle;
use crate::domain::{Fill, InstrumentKey, Order};
use crate::error::SimError;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Mark-to-market of the ledger on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub cash: f64,
    /// Σ quantity × price over priced non-zero positions.
    pub invested: f64,
    /// Σ |quantity × price|, longs and shorts alike.
    pub gross: f64,
    /// Held keys with no price on the date; they contribute zero.
    pub unpriced: Vec<InstrumentKey>,
}

impl Valuation {
    pub fn total(&self) -> f64 {
        self.cash + self.invested
    }
}

#[derive(Debug, Clone)]
pub struct PositionLedger {
    positions: BTreeMap<InstrumentKey, i64>,
    cash: f64,
}

impl PositionLedger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            positions: BTreeMap::new(),
            cash: initial_cash,
        }
    }

    /// Fill `order` at `price`: position += quantity, cash -= price × quantity.
    ///
    /// A position that would leave the `i64` range is `MalformedInput`, and
    /// the ledger is left untouched.
    pub fn apply(&mut self, order: &Order, price: f64) -> Result<Fill, SimError> {
        let position_after = self.position_after(&order.key, order.quantity)?;
        self.positions.insert(order.key.clone(), position_after);
        self.cash += order.cash_delta(price);

        Ok(Fill {
            date: order.date,
            key: order.key.clone(),
            quantity: order.quantity,
            price,
            notional: price * order.quantity as f64,
            position_after,
            cash_after: self.cash,
        })
    }

    /// The position `key` would hold after trading `quantity` more shares.
    pub fn position_after(&self, key: &InstrumentKey, quantity: i64) -> Result<i64, SimError> {
        self.position(key)
            .checked_add(quantity)
            .ok_or_else(|| SimError::MalformedInput {
                reason: format!("position in {key} overflows after trading {quantity} shares"),
            })
    }

    /// Value every non-zero position at `date`'s prices.
    pub fn value_at(&self, date: NaiveDate, oracle: &PriceOracle) -> Valuation {
        let mut invested = 0.0;
        let mut gross = 0.0;
        let mut unpriced = Vec::new();
        for (key, &quantity) in &self.positions {
            if quantity == 0 {
                continue;
            }
            match oracle.lookup(date, key) {
                Some(price) => {
                    let market_value = quantity as f64 * price;
                    invested += market_value;
                    gross += market_value.abs();
                }
                None => unpriced.push(key.clone()),
            }
        }
        Valuation {
            cash: self.cash,
            invested,
            gross,
            unpriced,
        }
    }

    /// Non-zero positions only.
    pub fn snapshot(&self) -> BTreeMap<InstrumentKey, i64> {
        self.positions
            .iter()
            .filter(|(_, &q)| q != 0)
            .map(|(k, &q)| (k.clone(), q))
            .collect()
    }

    /// Current quantity for `key` (0 if never traded).
    pub fn position(&self, key: &InstrumentKey) -> i64 {
        self.positions.get(key).copied().unwrap_or(0)
    }

    /// Whether `key` has ever been traded, even if it is now flat.
    pub fn has_entry(&self, key: &InstrumentKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }
}
