//! The market maker: a single quoting agent that posts a two-sided market
//! around the observed mid, widened and skewed by its own inventory.
//!
//! It never reacts between refresh ticks — the scheduler is the only thing
//! that invokes it, on a fixed cadence (`mm_refresh_k`), and all of its
//! "latency" comes from that cadence rather than any clock of its own.

use tracing::info;

use crate::DEFAULT_REFERENCE_PRICE;
use crate::config::SimConfig;
use crate::orderbook::Snapshot;
use crate::orders::{Event, IdAllocator, OrderId, Side};
use crate::trade::Trade;

pub struct MarketMaker {
    half_spread_base: f64,
    inventory_widen_alpha: f64,
    skew_beta: f64,
    quote_size: u64,

    pub inventory: i64,
    pub cash: i64,
    active_bid: Option<OrderId>,
    active_ask: Option<OrderId>,
    last_refresh_time: Option<u64>,
}

impl MarketMaker {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            half_spread_base: config.mm_half_spread,
            inventory_widen_alpha: config.mm_inventory_widen_alpha,
            skew_beta: config.mm_skew_beta,
            quote_size: config.mm_quote_size,
            inventory: 0,
            cash: 0,
            active_bid: None,
            active_ask: None,
            last_refresh_time: None,
        }
    }

    pub fn active_bid(&self) -> Option<OrderId> {
        self.active_bid
    }

    pub fn active_ask(&self) -> Option<OrderId> {
        self.active_ask
    }

    pub fn last_refresh_time(&self) -> Option<u64> {
        self.last_refresh_time
    }

    /// Mark-to-market PnL: cash plus inventory valued at `mid`.
    pub fn mark_to_market(&self, mid: f64) -> f64 {
        self.cash as f64 + self.inventory as f64 * mid
    }

    /// Builds this refresh's cancel-replace event from the current
    /// top-of-book. Does not mutate the book itself — the scheduler
    /// dispatches the returned event through the matching engine, exactly
    /// like any other event.
    pub fn refresh(&mut self, ids: &mut IdAllocator, snapshot: &Snapshot, event_index: u64) -> Event {
        let reference = snapshot.mid.unwrap_or(DEFAULT_REFERENCE_PRICE);
        let half_spread = self.half_spread_base + self.inventory_widen_alpha * (self.inventory.abs() as f64);
        let skew = -self.skew_beta * (self.inventory as f64);

        let bid_price = (reference + skew - half_spread).round() as i64;
        let ask_price = (reference + skew + half_spread).round() as i64;

        let new_bid = (ids.next_id(), bid_price, self.quote_size);
        let new_ask = (ids.next_id(), ask_price, self.quote_size);

        info!(
            event_index,
            inventory = self.inventory,
            half_spread,
            skew,
            bid_price,
            ask_price,
            "market maker refreshing quotes"
        );

        let event = Event::QuoteRefresh {
            old_bid: self.active_bid,
            old_ask: self.active_ask,
            new_bid,
            new_ask,
        };

        // Optimistic bookkeeping: if the engine skips a crossing side this
        // tick, the next refresh's cancel of that id is a harmless
        // NotFound no-op rather than a dangling live quote.
        self.active_bid = Some(new_bid.0);
        self.active_ask = Some(new_ask.0);
        self.last_refresh_time = Some(event_index);
        event
    }

    /// Applies a fill against one of this maker's own resting quotes.
    /// Inventory and cash update atomically, per the sign convention in
    /// spec.md §4.5: a buy fill grows inventory and spends cash, a sell
    /// fill shrinks inventory and receives cash.
    pub fn apply_fill(&mut self, side: Side, price: i64, qty: u64) {
        match side {
            Side::Bid => {
                self.inventory += qty as i64;
                self.cash -= price * qty as i64;
            }
            Side::Ask => {
                self.inventory -= qty as i64;
                self.cash += price * qty as i64;
            }
        }
    }

    /// Inspects a batch of trades from one dispatched event and applies
    /// any that filled this maker's currently active quotes.
    pub fn absorb_trades(&mut self, trades: &[Trade]) {
        for trade in trades {
            if Some(trade.maker_id) == self.active_bid {
                self.apply_fill(Side::Bid, trade.price, trade.quantity);
            } else if Some(trade.maker_id) == self.active_ask {
                self.apply_fill(Side::Ask, trade.price, trade.quantity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlowProbabilities, OffsetDist, SizeDist};

    fn config() -> SimConfig {
        SimConfig {
            seed: 1,
            n_events: 100,
            tick_size: 1,
            lot_size: 1,
            mm_refresh_k: 10,
            mm_half_spread: 1.0,
            mm_inventory_widen_alpha: 1.0,
            mm_skew_beta: 1.0,
            mm_quote_size: 5,
            flow_probs: FlowProbabilities { limit: 0.6, market: 0.3, cancel: 0.1 },
            p_buy: 0.5,
            imbalance_schedule: None,
            p_informed: 0.0,
            signal_tau: 0.5,
            signal_mean_reversion: 0.1,
            info_horizon: 20,
            fundamental_beta: 0.05,
            price_offset_dist: OffsetDist::Uniform { low: -3, high: 3 },
            size_dist: SizeDist::Exponential { mean: 4.0 },
            markout_horizon: 20,
        }
    }

    #[test]
    fn cancel_replace_widens_and_skews_with_inventory() {
        let mut mm = MarketMaker::new(&config());
        mm.inventory = 3;
        let mut ids = IdAllocator::new();
        let snapshot = Snapshot {
            bid_price: Some(99),
            bid_size: Some(5),
            ask_price: Some(101),
            ask_size: Some(5),
            mid: Some(100.0),
            spread: Some(2),
        };
        let event = mm.refresh(&mut ids, &snapshot, 10);
        match event {
            Event::QuoteRefresh { new_bid, new_ask, old_bid, old_ask, .. } => {
                assert_eq!(old_bid, None);
                assert_eq!(old_ask, None);
                // half_spread = 1 + 1*3 = 4, skew = -1*3 = -3
                assert_eq!(new_bid.1, 100 - 3 - 4);
                assert_eq!(new_ask.1, 100 - 3 + 4);
            }
            _ => panic!("expected QuoteRefresh"),
        }
    }

    #[test]
    fn fills_update_inventory_and_cash_atomically() {
        let mut mm = MarketMaker::new(&config());
        let mut ids = IdAllocator::new();
        let snapshot = Snapshot { bid_price: None, bid_size: None, ask_price: None, ask_size: None, mid: None, spread: None };
        mm.refresh(&mut ids, &snapshot, 0);
        let bid_id = mm.active_bid().unwrap();

        mm.absorb_trades(&[Trade {
            sequence: 1,
            aggressor_side: Side::Ask,
            price: 95,
            quantity: 4,
            maker_id: bid_id,
            taker_id: 999,
            timestamp: 1,
        }]);

        assert_eq!(mm.inventory, 4);
        assert_eq!(mm.cash, -95 * 4);
    }

    #[test]
    fn at_most_one_active_bid_and_ask_after_refresh() {
        let mut mm = MarketMaker::new(&config());
        let mut ids = IdAllocator::new();
        let snapshot = Snapshot { bid_price: None, bid_size: None, ask_price: None, ask_size: None, mid: None, spread: None };
        mm.refresh(&mut ids, &snapshot, 0);
        let (first_bid, first_ask) = (mm.active_bid(), mm.active_ask());
        mm.refresh(&mut ids, &snapshot, 10);
        assert_ne!(mm.active_bid(), first_bid);
        assert_ne!(mm.active_ask(), first_ask);
        assert!(mm.active_bid().is_some());
        assert!(mm.active_ask().is_some());
    }
}
