//! Valuation trace — one record per calendar date, in calendar order.

use crate::domain::InstrumentKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// End-of-day state of the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    pub date: NaiveDate,
    /// cash + invested_capital
    pub value: f64,
    /// Mark-to-market of open positions, excluding cash.
    pub invested_capital: f64,
    pub cash: f64,
    /// Σ |quantity × price| over priced positions.
    #[serde(default)]
    pub gross_exposure: f64,
    /// Non-zero positions at the end of the day.
    #[serde(with = "holdings_serde")]
    pub holdings: BTreeMap<InstrumentKey, i64>,
    /// Held keys without a price on this date (valued at zero).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unpriced: Vec<InstrumentKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationTrace {
    records: Vec<ValuationRecord>,
}

impl ValuationTrace {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, record: ValuationRecord) {
        debug_assert!(
            self.records.last().map_or(true, |last| last.date < record.date),
            "valuation records must be appended in calendar order"
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[ValuationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&ValuationRecord> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&ValuationRecord> {
        self.records.last()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ValuationRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    /// Total portfolio value per date.
    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }

    pub fn invested(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.invested_capital).collect()
    }

    pub fn gross_exposures(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.gross_exposure).collect()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.records.last().map(|r| r.value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValuationRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a ValuationTrace {
    type Item = &'a ValuationRecord;
    type IntoIter = std::slice::Iter<'a, ValuationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// JSON object keys must be strings, so holdings travel as a list of pairs.
mod holdings_serde {
    use crate::domain::InstrumentKey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Holding {
        key: InstrumentKey,
        quantity: i64,
    }

    pub fn serialize<S: Serializer>(
        holdings: &BTreeMap<InstrumentKey, i64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<Holding> = holdings
            .iter()
            .map(|(key, &quantity)| Holding {
                key: key.clone(),
                quantity,
            })
            .collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<InstrumentKey, i64>, D::Error> {
        let list = Vec::<Holding>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|h| (h.key, h.quantity)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Leg;

    fn record(date: &str, value: f64) -> ValuationRecord {
        let mut holdings = BTreeMap::new();
        holdings.insert(InstrumentKey::composite("0", Leg::Target), 1000);
        holdings.insert(InstrumentKey::single("AAPL"), -5);
        ValuationRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            value,
            invested_capital: 0.0,
            cash: value,
            gross_exposure: 0.0,
            holdings,
            unpriced: Vec::new(),
        }
    }

    #[test]
    fn lookup_by_date() {
        let mut trace = ValuationTrace::default();
        trace.push(record("2024-01-02", 1.0));
        trace.push(record("2024-01-03", 2.0));
        let d = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(trace.get(d).map(|r| r.value), Some(2.0));
        assert_eq!(trace.final_value(), Some(2.0));
        assert_eq!(trace.values(), vec![1.0, 2.0]);
    }

    #[test]
    fn json_keeps_structured_holdings() {
        let mut trace = ValuationTrace::default();
        trace.push(record("2024-01-02", 100.0));
        let json = serde_json::to_string(&trace).unwrap();
        assert!(json.contains(r#""key":{"id":"0","leg":"target"}"#));
        let back: ValuationTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trace);
    }
}
