//! Implied completion probability from deal terms.
//!
//! With offer price `O`, gross spread `s` and a pre-announcement fallback
//! price `F`, the market-implied probability that the deal closes is
//! `p = (O × (1 − s) − F) / (O − F)`, clamped to `[0, 1]`.

use arblab_core::data::PriceOracle;
use arblab_core::domain::InstrumentKey;
use chrono::NaiveDate;

use crate::deals::Deal;

/// Number of pre-announcement prices averaged into the fallback price.
pub const DEFAULT_FALLBACK_WINDOW: usize = 10;

/// Per-share offer price from cash terms like `"157.0000/sh."`.
///
/// Total-value terms (`"26000.0000 Mln"`) yield `None`.
pub fn parse_offer_price(cash_terms: &str) -> Option<f64> {
    if !cash_terms.contains("/sh") {
        return None;
    }
    let amount = cash_terms.split('/').next()?;
    amount.replace(',', "").trim().parse::<f64>().ok()
}

/// Gross spread as a fraction, from `"4.25%"`.
pub fn parse_arb_spread(raw: &str) -> Option<f64> {
    let pct: f64 = raw.trim().trim_matches('%').trim().parse().ok()?;
    pct.is_finite().then_some(pct / 100.0)
}

/// Mean of the last `window` prices of `key` strictly before `announce`.
pub fn fallback_price(
    oracle: &PriceOracle,
    key: &InstrumentKey,
    announce: NaiveDate,
    window: usize,
) -> Option<f64> {
    let history = oracle.history_before(key, announce, window);
    if history.is_empty() {
        return None;
    }
    Some(history.iter().map(|(_, p)| p).sum::<f64>() / history.len() as f64)
}

pub fn implied_probability(offer: f64, spread: f64, fallback: f64) -> Option<f64> {
    let denominator = offer - fallback;
    if denominator == 0.0 {
        return None;
    }
    let p = (offer * (1.0 - spread) - fallback) / denominator;
    p.is_finite().then(|| p.clamp(0.0, 1.0))
}

/// Implied probability for `deal`, pricing the fallback from `key`'s history.
pub fn deal_probability(
    deal: &Deal,
    oracle: &PriceOracle,
    key: &InstrumentKey,
    window: usize,
) -> Option<f64> {
    let offer = parse_offer_price(deal.cash_terms.as_deref()?)?;
    let spread = parse_arb_spread(deal.arb_spread.as_deref()?)?;
    let fallback = fallback_price(oracle, key, deal.announce_date?, window)?;
    implied_probability(offer, spread, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblab_core::data::DuplicatePolicy;
    use arblab_core::domain::PriceRecord;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn offer_price_formats() {
        assert_eq!(parse_offer_price("157.0000/sh."), Some(157.0));
        assert_eq!(parse_offer_price("1,157.50/sh."), Some(1157.5));
        assert_eq!(parse_offer_price("26000.0000 Mln"), None);
        assert_eq!(parse_offer_price("n/a/sh"), None);
    }

    #[test]
    fn spread_is_a_fraction() {
        assert_eq!(parse_arb_spread("4.25%"), Some(0.0425));
        assert_eq!(parse_arb_spread(" 10 "), Some(0.1));
        assert_eq!(parse_arb_spread("wide"), None);
    }

    #[test]
    fn probability_is_clamped() {
        // O = 100, s = 5%, F = 60 → (95 − 60) / 40 = 0.875
        assert_eq!(implied_probability(100.0, 0.05, 60.0), Some(0.875));
        assert_eq!(implied_probability(100.0, -0.5, 60.0), Some(1.0));
        assert_eq!(implied_probability(100.0, 0.9, 60.0), Some(0.0));
        assert_eq!(implied_probability(60.0, 0.05, 60.0), None);
    }

    #[test]
    fn fallback_averages_window_before_announce() {
        let key = InstrumentKey::single("7");
        let records: Vec<_> = (1..=12)
            .map(|day| {
                PriceRecord::new(
                    NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                    key.clone(),
                    day as f64,
                )
            })
            .collect();
        let oracle = PriceOracle::build(&records, DuplicatePolicy::Fail).unwrap();

        // Days 2..=11 are the last ten before the 12th.
        assert_eq!(fallback_price(&oracle, &key, d("2024-01-12"), 10), Some(6.5));
        assert_eq!(fallback_price(&oracle, &key, d("2024-01-01"), 10), None);

        let mut deal = crate::deals::Deal::new("7", Some(d("2024-01-12")), None);
        deal.cash_terms = Some("16.5000/sh.".into());
        deal.arb_spread = Some("10%".into());
        // (14.85 − 6.5) / (16.5 − 6.5) = 0.835
        let p = deal_probability(&deal, &oracle, &key, 10).unwrap();
        assert!((p - 0.835).abs() < 1e-12);
    }
}
