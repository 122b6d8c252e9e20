//! The resting-order book: two price-ordered ladders of FIFO queues.
//!
//! Bids are keyed ascending in a [`BTreeMap`] and walked in reverse to find
//! the best (highest) bid; asks are keyed ascending and walked forwards to
//! find the best (lowest) ask. Within a price level, orders are strictly
//! ordered by `arrival_sequence` — the book assigns that sequence on
//! acceptance, so price-time priority cannot be gamed by an order that
//! knows its own id in advance.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::{debug, trace};

use crate::errors::Diagnostic;
use crate::orders::{Order, OrderId, Side};

/// A FIFO queue of resting orders at one (side, price). The book removes a
/// level the instant its queue empties — an empty level is never left
/// lying around for a later lookup to stumble over.
pub type PriceLevel = VecDeque<Order>;

/// Top-of-book snapshot returned after every event. `mid` is sticky: once
/// both sides have been seen, it holds the last mid even while one side is
/// currently empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub bid_price: Option<i64>,
    pub bid_size: Option<u64>,
    pub ask_price: Option<i64>,
    pub ask_size: Option<u64>,
    pub mid: Option<f64>,
    pub spread: Option<i64>,
}

pub struct OrderBook {
    bids: BTreeMap<i64, PriceLevel>,
    asks: BTreeMap<i64, PriceLevel>,
    id_index: HashMap<OrderId, (Side, i64)>,
    next_sequence: u64,
    last_known_mid: Option<f64>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            id_index: HashMap::new(),
            next_sequence: 0,
            last_known_mid: None,
        }
    }

    fn levels(&self, side: Side) -> &BTreeMap<i64, PriceLevel> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<i64, PriceLevel> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Places `order` at the tail of its (side, price) level, stamping
    /// `arrival_sequence` from the book's own counter. Rejects an order
    /// that would cross the resting opposite side: such orders must be
    /// routed through [`crate::engine::MatchingEngine::apply`] instead,
    /// which walks the cross before resting any remainder.
    pub fn insert(&mut self, mut order: Order) -> Result<(), Diagnostic> {
        match order.side {
            Side::Bid => {
                if let Some((&best_ask, _)) = self.asks.iter().next() {
                    if order.price >= best_ask {
                        return Err(Diagnostic::CrossedRest);
                    }
                }
            }
            Side::Ask => {
                if let Some((&best_bid, _)) = self.bids.iter().next_back() {
                    if order.price <= best_bid {
                        return Err(Diagnostic::CrossedRest);
                    }
                }
            }
        }

        order.arrival_sequence = self.next_sequence;
        self.next_sequence += 1;
        let id = order.id;
        let side = order.side;
        let price = order.price;
        self.levels_mut(side).entry(price).or_default().push_back(order);
        self.id_index.insert(id, (side, price));
        trace!(id, ?side, price, "order rested");
        Ok(())
    }

    /// Removes `id`'s remaining quantity from its level and the id index.
    /// Idempotent: cancelling an unknown id is a no-op, reported as
    /// [`Diagnostic::NotFound`] rather than a hard error.
    pub fn cancel(&mut self, id: OrderId) -> Result<(), Diagnostic> {
        let Some((side, price)) = self.id_index.remove(&id) else {
            return Err(Diagnostic::NotFound);
        };
        let levels = self.levels_mut(side);
        if let Some(level) = levels.get_mut(&price) {
            if let Some(pos) = level.iter().position(|o| o.id == id) {
                level.remove(pos);
            }
            if level.is_empty() {
                levels.remove(&price);
            }
        }
        debug!(id, "order cancelled");
        Ok(())
    }

    pub fn best_bid(&self) -> Option<(i64, u64)> {
        self.bids
            .iter()
            .next_back()
            .map(|(&price, level)| (price, level.iter().map(|o| o.remaining_qty).sum()))
    }

    pub fn best_ask(&self) -> Option<(i64, u64)> {
        self.asks
            .iter()
            .next()
            .map(|(&price, level)| (price, level.iter().map(|o| o.remaining_qty).sum()))
    }

    /// Aggregate resting quantity at `(side, price)`, zero if the level
    /// does not exist.
    pub fn depth(&self, side: Side, price: i64) -> u64 {
        self.levels(side)
            .get(&price)
            .map(|level| level.iter().map(|o| o.remaining_qty).sum())
            .unwrap_or(0)
    }

    /// Total resting quantity on one side, across all price levels.
    pub fn total_depth(&self, side: Side) -> u64 {
        self.levels(side)
            .values()
            .flat_map(|level| level.iter())
            .map(|o| o.remaining_qty)
            .sum()
    }

    pub fn snapshot(&mut self) -> Snapshot {
        let bid = self.best_bid();
        let ask = self.best_ask();
        if let (Some((bp, _)), Some((ap, _))) = (bid, ask) {
            self.last_known_mid = Some((bp as f64 + ap as f64) / 2.0);
        }
        Snapshot {
            bid_price: bid.map(|(p, _)| p),
            bid_size: bid.map(|(_, s)| s),
            ask_price: ask.map(|(p, _)| p),
            ask_size: ask.map(|(_, s)| s),
            mid: self.last_known_mid,
            spread: match (bid, ask) {
                (Some((bp, _)), Some((ap, _))) => Some(ap - bp),
                _ => None,
            },
        }
    }

    /// Front-of-queue order at `(side, price)`, for the matching engine.
    pub(crate) fn front_mut(&mut self, side: Side, price: i64) -> Option<&mut Order> {
        self.levels_mut(side).get_mut(&price).and_then(|l| l.front_mut())
    }

    /// Moves the front order at `(side, price)` to the back of its queue
    /// without filling it. Used only by the engine's defensive self-trade
    /// guard, which is otherwise unreachable since order ids are unique.
    pub(crate) fn requeue_front(&mut self, side: Side, price: i64) {
        if let Some(level) = self.levels_mut(side).get_mut(&price) {
            if let Some(order) = level.pop_front() {
                level.push_back(order);
            }
        }
    }

    /// Pops the (now fully filled) front order at `(side, price)`, pruning
    /// the level and the id index if it was the last order there.
    pub(crate) fn pop_front(&mut self, side: Side, price: i64) {
        let levels = self.levels_mut(side);
        if let Some(level) = levels.get_mut(&price) {
            if let Some(order) = level.pop_front() {
                self.id_index.remove(&order.id);
            }
            if level.is_empty() {
                levels.remove(&price);
            }
        }
    }

    /// Best opposite-side price an aggressor on `side` would walk into.
    pub(crate) fn best_opposite(&self, side: Side) -> Option<i64> {
        match side {
            Side::Bid => self.asks.keys().next().copied(),
            Side::Ask => self.bids.keys().next_back().copied(),
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
