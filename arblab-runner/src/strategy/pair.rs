//! Pair arbitrage for stock-for-stock deals: long the target, short the acquirer.
//!
//! Entry is the first day both legs are priced on or after the announce
//! date; exit is the last day both legs are priced on or before completion.
//! Each leg is sized to `capital_each_side` at its entry price.

use arblab_core::data::{PriceOracle, TradingCalendar};
use arblab_core::domain::{InstrumentKey, Leg, Order};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{filter_matches, sort_by_date, OrderGenerator};
use crate::deals::Deal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairParams {
    /// Nominal capital per leg.
    pub capital_each_side: f64,
    /// Only deals with this payment type (`"any"` for all).
    pub payment_type: String,
}

impl Default for PairParams {
    fn default() -> Self {
        Self {
            capital_each_side: 10_000.0,
            payment_type: "Stock".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PairArbitrage {
    params: PairParams,
}

/// Entry and exit for one deal, with the share count of each leg.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PairPlan {
    entry: NaiveDate,
    exit: NaiveDate,
    target_shares: i64,
    acquirer_shares: i64,
}

impl PairArbitrage {
    pub fn new(params: PairParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PairParams {
        &self.params
    }

    fn plan(&self, deal: &Deal, oracle: &PriceOracle) -> Result<PairPlan, &'static str> {
        let target = InstrumentKey::composite(deal.deal_id.as_str(), Leg::Target);
        let acquirer = InstrumentKey::composite(deal.deal_id.as_str(), Leg::Acquirer);
        if oracle.series(&target).is_empty() || oracle.series(&acquirer).is_empty() {
            return Err("missing prices for a leg");
        }
        let announce = deal.announce_date.ok_or("no announce date")?;
        let completion = deal.completion_date.ok_or("no completion date")?;

        let (t_first, _) = oracle
            .first_on_or_after(&target, announce)
            .ok_or("target not priced after announce")?;
        let (a_first, _) = oracle
            .first_on_or_after(&acquirer, announce)
            .ok_or("acquirer not priced after announce")?;
        let entry = t_first.max(a_first);

        let (t_last, _) = oracle
            .last_on_or_before(&target, completion)
            .ok_or("target not priced before completion")?;
        let (a_last, _) = oracle
            .last_on_or_before(&acquirer, completion)
            .ok_or("acquirer not priced before completion")?;
        let exit = t_last.min(a_last);

        if exit <= entry {
            return Err("exit is not after entry");
        }

        let (Some(t_price), Some(a_price)) =
            (oracle.lookup(entry, &target), oracle.lookup(entry, &acquirer))
        else {
            return Err("legs not priced on the same entry day");
        };
        if !(oracle.contains(exit, &target) && oracle.contains(exit, &acquirer)) {
            return Err("legs not priced on the same exit day");
        }

        let target_shares = self.shares_for(t_price).ok_or("non-positive target price")?;
        let acquirer_shares = self.shares_for(a_price).ok_or("non-positive acquirer price")?;
        if target_shares == 0 || acquirer_shares == 0 {
            return Err("capital buys zero shares of a leg");
        }

        Ok(PairPlan {
            entry,
            exit,
            target_shares,
            acquirer_shares,
        })
    }

    fn shares_for(&self, price: f64) -> Option<i64> {
        (price > 0.0).then(|| (self.params.capital_each_side / price).floor() as i64)
    }
}

impl OrderGenerator for PairArbitrage {
    fn name(&self) -> &'static str {
        "pair_arbitrage"
    }

    fn generate(
        &self,
        deals: &[Deal],
        oracle: &PriceOracle,
        _calendar: &TradingCalendar,
    ) -> Vec<Order> {
        let mut orders = Vec::new();

        for deal in deals {
            if !filter_matches(&self.params.payment_type, &deal.payment_type) {
                continue;
            }
            let plan = match self.plan(deal, oracle) {
                Ok(plan) => plan,
                Err(reason) => {
                    warn!(deal = %deal.deal_id, reason, "pair deal skipped");
                    continue;
                }
            };

            let target = InstrumentKey::composite(deal.deal_id.as_str(), Leg::Target);
            let acquirer = InstrumentKey::composite(deal.deal_id.as_str(), Leg::Acquirer);
            orders.push(Order::new(plan.entry, target.clone(), plan.target_shares));
            orders.push(Order::new(plan.entry, acquirer.clone(), -plan.acquirer_shares));
            orders.push(Order::new(plan.exit, target, -plan.target_shares));
            orders.push(Order::new(plan.exit, acquirer, plan.acquirer_shares));
        }

        debug!(count = orders.len(), "pair-arbitrage orders generated");
        sort_by_date(orders)
    }
}
