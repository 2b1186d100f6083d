//! Price oracle — `(date, key) → price` lookup.
//!
//! Built once from price records and read-only afterwards. Duplicate
//! `(date, key)` pairs are resolved by an explicit [`DuplicatePolicy`] at build
//! time so a lookup never has to choose between two prices.

use super::calendar::TradingCalendar;
use crate::domain::{DatasetHash, InstrumentKey, PriceRecord};
use crate::error::SimError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// What to do when two or more records share a `(date, key)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Reject the input with `DuplicatePriceRecord`.
    Fail,
    /// Replace the group with the mean of its prices.
    #[default]
    Average,
    /// Keep the first record in input order.
    FirstWins,
}

#[derive(Debug, Clone)]
pub struct PriceOracle {
    prices: HashMap<NaiveDate, HashMap<InstrumentKey, f64>>,
    len: usize,
    /// Per-key sorted price history, for the date-range queries strategies need.
    history: BTreeMap<InstrumentKey, Vec<(NaiveDate, f64)>>,
}

impl PriceOracle {
    pub fn build(records: &[PriceRecord], policy: DuplicatePolicy) -> Result<Self, SimError> {
        // (sum, count, first) per group; input order is kept for FirstWins.
        let mut groups: HashMap<(NaiveDate, InstrumentKey), (f64, usize, f64)> =
            HashMap::with_capacity(records.len());

        for record in records {
            if !record.price.is_finite() {
                return Err(SimError::MalformedInput {
                    reason: format!(
                        "non-finite price {} for {} on {}",
                        record.price, record.key, record.date
                    ),
                });
            }
            groups
                .entry((record.date, record.key.clone()))
                .and_modify(|(sum, count, _)| {
                    *sum += record.price;
                    *count += 1;
                })
                .or_insert((record.price, 1, record.price));
        }

        if policy == DuplicatePolicy::Fail {
            // Report the first duplicated pair in input order.
            for record in records {
                let group_key = (record.date, record.key.clone());
                if let Some((_, count, _)) = groups.get(&group_key) {
                    if *count > 1 {
                        return Err(SimError::DuplicatePriceRecord {
                            date: record.date,
                            key: record.key.clone(),
                            count: *count,
                        });
                    }
                }
            }
        }

        let len = groups.len();
        let mut prices: HashMap<NaiveDate, HashMap<InstrumentKey, f64>> = HashMap::new();
        let mut history: BTreeMap<InstrumentKey, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        let mut collapsed = 0usize;
        for ((date, key), (sum, count, first)) in groups {
            let price = match (count, policy) {
                (1, _) => first,
                (_, DuplicatePolicy::Average) => {
                    collapsed += 1;
                    sum / count as f64
                }
                (_, DuplicatePolicy::FirstWins) | (_, DuplicatePolicy::Fail) => {
                    collapsed += 1;
                    first
                }
            };
            history.entry(key.clone()).or_default().push((date, price));
            prices.entry(date).or_default().insert(key, price);
        }
        for series in history.values_mut() {
            series.sort_by_key(|(date, _)| *date);
        }

        if collapsed > 0 {
            warn!(
                groups = collapsed,
                policy = ?policy,
                "collapsed duplicate (date, key) price records"
            );
        }

        Ok(Self {
            prices,
            len,
            history,
        })
    }

    pub fn lookup(&self, date: NaiveDate, key: &InstrumentKey) -> Option<f64> {
        self.prices.get(&date).and_then(|day| day.get(key)).copied()
    }

    /// Like [`lookup`](Self::lookup) but a missing price is an error naming the date and key.
    pub fn price(&self, date: NaiveDate, key: &InstrumentKey) -> Result<f64, SimError> {
        self.lookup(date, key).ok_or_else(|| SimError::MissingPrice {
            date,
            key: key.clone(),
        })
    }

    pub fn contains(&self, date: NaiveDate, key: &InstrumentKey) -> bool {
        self.lookup(date, key).is_some()
    }

    /// Number of distinct `(date, key)` prices.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = &InstrumentKey> {
        self.history.keys()
    }

    /// The trading calendar implied by this oracle's dates.
    pub fn calendar(&self) -> TradingCalendar {
        TradingCalendar::from_dates(self.prices.keys().copied())
    }

    /// Sorted `(date, price)` history of one key.
    pub fn series(&self, key: &InstrumentKey) -> &[(NaiveDate, f64)] {
        self.history.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First priced `(date, price)` for `key` on or after `date`.
    pub fn first_on_or_after(
        &self,
        key: &InstrumentKey,
        date: NaiveDate,
    ) -> Option<(NaiveDate, f64)> {
        let series = self.series(key);
        let idx = series.partition_point(|(d, _)| *d < date);
        series.get(idx).copied()
    }

    /// Last priced `(date, price)` for `key` on or before `date`.
    pub fn last_on_or_before(
        &self,
        key: &InstrumentKey,
        date: NaiveDate,
    ) -> Option<(NaiveDate, f64)> {
        let series = self.series(key);
        let idx = series.partition_point(|(d, _)| *d <= date);
        idx.checked_sub(1).map(|i| series[i])
    }

    /// Up to `window` most recent prices of `key` strictly before `date`, oldest first.
    pub fn history_before(
        &self,
        key: &InstrumentKey,
        date: NaiveDate,
        window: usize,
    ) -> &[(NaiveDate, f64)] {
        let series = self.series(key);
        let end = series.partition_point(|(d, _)| *d < date);
        &series[end.saturating_sub(window)..end]
    }

    /// BLAKE3 hash over every `(key, date, price)` in key/date order.
    ///
    /// Independent of the input record order, so two oracles built from the
    /// same data hash identically.
    pub fn dataset_hash(&self) -> DatasetHash {
        let mut hasher = blake3::Hasher::new();
        for (key, series) in &self.history {
            hasher.update(key.to_string().as_bytes());
            hasher.update(&[u8::from(key.leg().is_some())]);
            for (date, price) in series {
                hasher.update(date.to_string().as_bytes());
                hasher.update(&price.to_le_bytes());
            }
        }
        DatasetHash(hasher.finalize().to_hex().to_string())
    }
}
