use super::key::InstrumentKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reference (closing) price of one instrument on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub key: InstrumentKey,
    pub price: f64,
}

impl PriceRecord {
    pub fn new(date: NaiveDate, key: InstrumentKey, price: f64) -> Self {
        Self { date, key, price }
    }
}
