//! Announce-to-completion: buy after a deal is announced, sell before it closes.
//!
//! For each eligible deal:
//! - buy `shares_on_announce` on the first session strictly after the announce date
//! - sell the same amount `exit_offset` sessions before the completion date
//!
//! Either leg is dropped on its own when its date is missing or cannot be
//! snapped onto the calendar.

use arblab_core::data::{PriceOracle, TradingCalendar};
use arblab_core::domain::{KeyShape, Leg, Order};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{filter_matches, sort_by_date, OrderGenerator};
use crate::deals::Deal;
use crate::probability::{deal_probability, DEFAULT_FALLBACK_WINDOW};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceParams {
    pub shares_on_announce: i64,
    /// Sessions between the exit and the completion date.
    pub exit_offset: usize,
    /// Only deals with this payment type (`"any"` for all).
    pub payment_type: String,
    /// Only deals of this type (`"any"` for all).
    pub deal_type: String,
    /// Drop deals whose implied probability is below this, or unknown.
    pub min_probability: Option<f64>,
    /// Trade `floor(shares × p)` instead of a fixed size.
    pub scale_with_probability: bool,
    pub fallback_window: usize,
}

impl Default for AnnounceParams {
    fn default() -> Self {
        Self {
            shares_on_announce: 100,
            exit_offset: 2,
            payment_type: "Cash".into(),
            deal_type: "M&A".into(),
            min_probability: None,
            scale_with_probability: false,
            fallback_window: DEFAULT_FALLBACK_WINDOW,
        }
    }
}

impl AnnounceParams {
    fn uses_probability(&self) -> bool {
        self.min_probability.is_some() || self.scale_with_probability
    }
}

#[derive(Debug, Clone)]
pub struct AnnounceToCompletion {
    params: AnnounceParams,
    key_shape: KeyShape,
}

impl AnnounceToCompletion {
    pub fn new(params: AnnounceParams, key_shape: KeyShape) -> Self {
        Self { params, key_shape }
    }

    pub fn params(&self) -> &AnnounceParams {
        &self.params
    }

    /// Shares to trade for `deal`, or `None` when the deal is filtered out.
    fn position_size(&self, deal: &Deal, oracle: &PriceOracle) -> Option<i64> {
        let p = &self.params;
        if !p.uses_probability() {
            return Some(p.shares_on_announce);
        }

        let key = self.key_shape.key(&deal.deal_id, Some(Leg::Target))?;
        let Some(prob) = deal_probability(deal, oracle, &key, p.fallback_window) else {
            debug!(deal = %deal.deal_id, "no implied probability; deal skipped");
            return None;
        };
        if p.min_probability.is_some_and(|min| prob < min) {
            debug!(deal = %deal.deal_id, prob, "implied probability below threshold");
            return None;
        }
        if !p.scale_with_probability {
            return Some(p.shares_on_announce);
        }
        let shares = (p.shares_on_announce as f64 * prob).floor() as i64;
        (shares != 0).then_some(shares)
    }
}

impl OrderGenerator for AnnounceToCompletion {
    fn name(&self) -> &'static str {
        "announce_to_completion"
    }

    fn generate(
        &self,
        deals: &[Deal],
        oracle: &PriceOracle,
        calendar: &TradingCalendar,
    ) -> Vec<Order> {
        let p = &self.params;
        let mut orders = Vec::new();

        for deal in deals {
            if !filter_matches(&p.payment_type, &deal.payment_type)
                || !filter_matches(&p.deal_type, &deal.deal_type)
            {
                continue;
            }
            let Some(shares) = self.position_size(deal, oracle) else {
                continue;
            };
            let Some(key) = self.key_shape.key(&deal.deal_id, Some(Leg::Target)) else {
                continue;
            };

            let entry = deal.announce_date.and_then(|d| calendar.next_after(d));
            let exit = deal
                .completion_date
                .and_then(|d| calendar.sessions_before(d, p.exit_offset));

            if entry.is_none() && exit.is_none() {
                warn!(deal = %deal.deal_id, "no tradeable dates; deal skipped");
                continue;
            }
            if let Some(date) = entry {
                orders.push(Order::new(date, key.clone(), shares));
            }
            if let Some(date) = exit {
                orders.push(Order::new(date, key, -shares));
            }
        }

        debug!(count = orders.len(), "announce-to-completion orders generated");
        sort_by_date(orders)
    }
}
