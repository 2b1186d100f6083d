//! Corporate-event deal records.
//!
//! One row of the deal sheet. Dates are parsed leniently: anything that is
//! not a recognised date becomes `None` and the dependent leg is skipped by
//! the order generators.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub deal_id: String,
    pub announce_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub amendment_date: Option<NaiveDate>,
    /// e.g. "Cash", "Stock", "Cash and Stock"
    pub payment_type: String,
    /// e.g. "M&A"
    pub deal_type: String,
    /// Raw offer terms, e.g. "157.0000/sh." or "26000.0000 Mln".
    pub cash_terms: Option<String>,
    /// Raw gross arbitrage spread, e.g. "4.25%".
    pub arb_spread: Option<String>,
    pub target_ticker: Option<String>,
}

impl Deal {
    /// Convenience constructor for a deal with only the fields the
    /// announce/complete strategy reads.
    pub fn new(
        deal_id: impl Into<String>,
        announce_date: Option<NaiveDate>,
        completion_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            deal_id: deal_id.into(),
            announce_date,
            completion_date,
            amendment_date: None,
            payment_type: "Cash".into(),
            deal_type: "M&A".into(),
            cash_terms: None,
            arb_spread: None,
            target_ticker: None,
        }
    }

    /// Payment type matches `kind`, ignoring surrounding whitespace.
    pub fn pays(&self, kind: &str) -> bool {
        self.payment_type.trim() == kind.trim()
    }

    pub fn is_cash(&self) -> bool {
        self.pays("Cash")
    }

    pub fn is_stock(&self) -> bool {
        self.pays("Stock")
    }

    pub fn is_type(&self, deal_type: &str) -> bool {
        self.deal_type.trim() == deal_type.trim()
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date cell. Returns `None` for blanks and anything unrecognised.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2023, 10, 11);
        assert_eq!(parse_date("2023-10-11"), expected);
        assert_eq!(parse_date("10/11/2023"), expected);
        assert_eq!(parse_date(" 2023-10-11 00:00:00 "), expected);
        assert_eq!(parse_date("2023-10-11T16:00:00"), expected);
    }

    #[test]
    fn parse_date_coerces_garbage_to_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("pending"), None);
        assert_eq!(parse_date("2023-13-45"), None);
    }

    #[test]
    fn payment_filters_ignore_padding() {
        let mut deal = Deal::new("1", None, None);
        deal.payment_type = " Stock ".into();
        assert!(deal.is_stock());
        assert!(!deal.is_cash());
        assert!(deal.is_type("M&A"));
    }
}
