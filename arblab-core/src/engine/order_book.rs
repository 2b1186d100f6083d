//! Order book — the replay queue of scheduled orders, grouped by date.
//!
//! No validation happens here beyond grouping; price and calendar checks are
//! made by the simulation when an order is executed.

use crate::domain::Order;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    by_date: BTreeMap<NaiveDate, Vec<Order>>,
    len: usize,
}

impl OrderBook {
    /// Group orders by date. Within a date the input sequence is preserved.
    pub fn new<I: IntoIterator<Item = Order>>(orders: I) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<Order>> = BTreeMap::new();
        let mut len = 0;
        for order in orders {
            by_date.entry(order.date).or_default().push(order);
            len += 1;
        }
        Self { by_date, len }
    }

    /// Orders scheduled for `date`, in input order (empty if none).
    pub fn orders_for(&self, date: NaiveDate) -> &[Order] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct order dates, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    /// All orders in date order, input order within a date.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.by_date.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromIterator<Order> for OrderBook {
    fn from_iter<I: IntoIterator<Item = Order>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstrumentKey;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn order(date: &str, key: &str, qty: i64) -> Order {
        Order::new(d(date), InstrumentKey::single(key), qty)
    }

    #[test]
    fn groups_by_date_and_keeps_intra_day_order() {
        let book = OrderBook::new(vec![
            order("2024-01-03", "B", 5),
            order("2024-01-02", "A", 1),
            order("2024-01-03", "A", -2),
            order("2024-01-03", "B", 7),
        ]);

        assert_eq!(book.len(), 4);
        assert_eq!(book.dates().collect::<Vec<_>>(), vec![d("2024-01-02"), d("2024-01-03")]);

        let day = book.orders_for(d("2024-01-03"));
        let quantities: Vec<i64> = day.iter().map(|o| o.quantity).collect();
        assert_eq!(quantities, vec![5, -2, 7]);
    }

    #[test]
    fn missing_date_is_empty_slice() {
        let book = OrderBook::new(vec![order("2024-01-02", "A", 1)]);
        assert!(book.orders_for(d("2024-01-05")).is_empty());
    }

    #[test]
    fn iter_is_chronological() {
        let book: OrderBook = vec![order("2024-01-05", "A", 1), order("2024-01-02", "A", 2)]
            .into_iter()
            .collect();
        let dates: Vec<_> = book.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d("2024-01-02"), d("2024-01-05")]);
    }

    #[test]
    fn empty_book() {
        let book = OrderBook::default();
        assert!(book.is_empty());
        assert_eq!(book.iter().count(), 0);
    }
}
