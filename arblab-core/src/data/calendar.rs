//! Trading calendar — the ordered set of valid simulation dates.
//!
//! Built from the distinct dates present in the price data. Order-generation
//! code uses the snapping queries to move arbitrary event dates onto trading
//! days; all of them are binary searches and return `None` past either end.

use crate::domain::PriceRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    /// Sort and deduplicate an arbitrary collection of dates.
    pub fn from_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        let unique: BTreeSet<NaiveDate> = dates.into_iter().collect();
        Self {
            dates: unique.into_iter().collect(),
        }
    }

    pub fn from_prices(records: &[PriceRecord]) -> Self {
        Self::from_dates(records.iter().map(|r| r.date))
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn get(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Earliest trading day strictly after `date`.
    pub fn next_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d <= date);
        self.dates.get(idx).copied()
    }

    /// Latest trading day strictly before `date`.
    pub fn previous_before(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d < date);
        idx.checked_sub(1).map(|i| self.dates[i])
    }

    /// Earliest trading day on or after `date`.
    pub fn on_or_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d < date);
        self.dates.get(idx).copied()
    }

    /// Latest trading day on or before `date`.
    pub fn on_or_before(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d <= date);
        idx.checked_sub(1).map(|i| self.dates[i])
    }

    /// The `sessions`-th trading day strictly before `date`.
    ///
    /// `sessions_before(d, 1)` equals `previous_before(d)`; `sessions == 0` is `None`.
    pub fn sessions_before(&self, date: NaiveDate, sessions: usize) -> Option<NaiveDate> {
        if sessions == 0 {
            return None;
        }
        let idx = self.dates.partition_point(|d| *d < date);
        idx.checked_sub(sessions).map(|i| self.dates[i])
    }

    /// The `sessions`-th trading day strictly after `date`.
    pub fn sessions_after(&self, date: NaiveDate, sessions: usize) -> Option<NaiveDate> {
        if sessions == 0 {
            return None;
        }
        let idx = self.dates.partition_point(|d| *d <= date);
        idx.checked_add(sessions - 1)
            .and_then(|i| self.dates.get(i))
            .copied()
    }
}

impl<'a> IntoIterator for &'a TradingCalendar {
    type Item = &'a NaiveDate;
    type IntoIter = std::slice::Iter<'a, NaiveDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.dates.iter()
    }
}
