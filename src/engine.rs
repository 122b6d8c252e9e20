//! The matching engine: applies one [`Event`] at a time to an [`OrderBook`],
//! producing trades and a post-event snapshot. This is the only place that
//! mutates the book — agents never touch it directly, only through the
//! snapshots this returns.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::errors::Diagnostic;
use crate::orderbook::{OrderBook, Snapshot};
use crate::orders::{Event, Order, OrderId, Side};
use crate::trade::Trade;

pub struct MatchingEngine {
    trade_sequence: u64,
    diagnostics: HashMap<Diagnostic, u64>,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            trade_sequence: 0,
            diagnostics: HashMap::new(),
        }
    }

    pub fn diagnostics(&self) -> &HashMap<Diagnostic, u64> {
        &self.diagnostics
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        *self.diagnostics.entry(diagnostic).or_insert(0) += 1;
    }

    /// Dispatches `event` against `book`, returning every trade it produced
    /// (in maker-consumption order) and the book's post-event snapshot.
    pub fn apply(&mut self, book: &mut OrderBook, event: Event, event_index: u64) -> (Vec<Trade>, Snapshot) {
        let trades = match event {
            Event::LimitOrder { id, side, price, qty } => {
                let trades = self.walk(book, side, id, qty, Some(price), event_index);
                let filled: u64 = trades.iter().map(|t| t.quantity).sum();
                let residual = qty - filled;
                if residual > 0 {
                    let order = Order {
                        id,
                        side,
                        price,
                        remaining_qty: residual,
                        arrival_sequence: 0,
                    };
                    if let Err(diagnostic) = book.insert(order) {
                        // The walk above only stops once the book no longer
                        // crosses `price`, so this should be unreachable;
                        // record it rather than panic if invariants ever slip.
                        warn!(id, "residual limit order unexpectedly crossed on rest");
                        self.record(diagnostic);
                    }
                }
                trades
            }
            Event::MarketOrder { id, side, qty } => {
                let trades = self.walk(book, side, id, qty, None, event_index);
                let filled: u64 = trades.iter().map(|t| t.quantity).sum();
                if filled < qty {
                    self.record(Diagnostic::ExhaustedBook);
                }
                trades
            }
            Event::Cancel { id } => {
                if let Err(diagnostic) = book.cancel(id) {
                    self.record(diagnostic);
                }
                Vec::new()
            }
            Event::QuoteRefresh { old_bid, old_ask, new_bid, new_ask } => {
                self.quote_refresh(book, old_bid, old_ask, new_bid, new_ask);
                Vec::new()
            }
        };
        info!(event_index, trades = trades.len(), "event applied");
        let snapshot = book.snapshot();
        (trades, snapshot)
    }

    /// Cancel-replace: cancel both old quotes, then insert both new ones.
    /// Either new side is silently skipped (as [`Diagnostic::CrossedQuote`])
    /// if it would cross the opposing book; the other side still goes in.
    fn quote_refresh(
        &mut self,
        book: &mut OrderBook,
        old_bid: Option<OrderId>,
        old_ask: Option<OrderId>,
        new_bid: (OrderId, i64, u64),
        new_ask: (OrderId, i64, u64),
    ) {
        if let Some(id) = old_bid {
            let _ = book.cancel(id);
        }
        if let Some(id) = old_ask {
            let _ = book.cancel(id);
        }
        let (id, price, qty) = new_bid;
        if qty > 0 {
            let order = Order { id, side: Side::Bid, price, remaining_qty: qty, arrival_sequence: 0 };
            if book.insert(order).is_err() {
                self.record(Diagnostic::CrossedQuote);
            }
        }
        let (id, price, qty) = new_ask;
        if qty > 0 {
            let order = Order { id, side: Side::Ask, price, remaining_qty: qty, arrival_sequence: 0 };
            if book.insert(order).is_err() {
                self.record(Diagnostic::CrossedQuote);
            }
        }
    }

    /// Walks the opposite side of `side`, consuming resting orders head
    /// first at each qualifying price level until `qty` is exhausted or no
    /// level qualifies. `cap` is the aggressor's limit price for a
    /// marketable limit order, or `None` for a market order (no price
    /// cap — the walk only stops when the book runs out).
    fn walk(
        &mut self,
        book: &mut OrderBook,
        side: Side,
        taker_id: OrderId,
        mut qty: u64,
        cap: Option<i64>,
        event_index: u64,
    ) -> Vec<Trade> {
        let opposite = side.opposite();
        let mut trades = Vec::new();

        while qty > 0 {
            let Some(level_price) = book.best_opposite(side) else {
                break;
            };
            if let Some(cap) = cap {
                let crosses = match side {
                    Side::Bid => level_price <= cap,
                    Side::Ask => level_price >= cap,
                };
                if !crosses {
                    break;
                }
            }

            loop {
                if qty == 0 {
                    break;
                }
                let Some(maker) = book.front_mut(opposite, level_price) else {
                    break;
                };

                if maker.id == taker_id {
                    // Structurally unreachable (ids are unique per order),
                    // but the spec calls for this guard explicitly: skip
                    // past the offending maker instead of trading with it.
                    book.requeue_front(opposite, level_price);
                    continue;
                }

                let maker_id = maker.id;
                let trade_qty = qty.min(maker.remaining_qty);
                maker.remaining_qty -= trade_qty;
                qty -= trade_qty;
                let maker_exhausted = maker.remaining_qty == 0;

                self.trade_sequence += 1;
                trades.push(Trade {
                    sequence: self.trade_sequence,
                    aggressor_side: side,
                    price: level_price,
                    quantity: trade_qty,
                    maker_id,
                    taker_id,
                    timestamp: event_index,
                });

                if maker_exhausted {
                    book.pop_front(opposite, level_price);
                }
            }
        }

        trades
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(engine: &mut MatchingEngine, book: &mut OrderBook, id: OrderId, side: Side, price: i64, qty: u64) -> Vec<Trade> {
        engine.apply(book, Event::LimitOrder { id, side, price, qty }, 0).0
    }

    fn market(engine: &mut MatchingEngine, book: &mut OrderBook, id: OrderId, side: Side, qty: u64) -> Vec<Trade> {
        engine.apply(book, Event::MarketOrder { id, side, qty }, 0).0
    }

    #[test]
    fn empty_book_single_limit_bid_rests() {
        let mut book = OrderBook::new();
        let mut engine = MatchingEngine::new();
        let trades = limit(&mut engine, &mut book, 1, Side::Bid, 100, 10);
        assert!(trades.is_empty());
        assert_eq!(book.best_bid(), Some((100, 10)));
    }

    #[test]
    fn market_buy_sweeps_two_ask_levels_fifo() {
        let mut book = OrderBook::new();
        let mut engine = MatchingEngine::new();
        limit(&mut engine, &mut book, 1, Side::Ask, 101, 5);
        limit(&mut engine, &mut book, 2, Side::Ask, 101, 5);

        let trades = market(&mut engine, &mut book, 3, Side::Bid, 7);
        assert_eq!(trades.len(), 2);
        assert_eq!((trades[0].maker_id, trades[0].quantity), (1, 5));
        assert_eq!((trades[1].maker_id, trades[1].quantity), (2, 2));
        assert_eq!(book.depth(Side::Ask, 101), 3);
    }

    #[test]
    fn marketable_limit_rests_residual_at_aggressor_price() {
        let mut book = OrderBook::new();
        let mut engine = MatchingEngine::new();
        limit(&mut engine, &mut book, 1, Side::Ask, 101, 4);

        let trades = limit(&mut engine, &mut book, 2, Side::Bid, 102, 10);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 101);
        assert_eq!(trades[0].quantity, 4);
        assert_eq!(book.best_bid(), Some((102, 6)));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn market_order_residual_is_dropped_not_rested() {
        let mut book = OrderBook::new();
        let mut engine = MatchingEngine::new();
        limit(&mut engine, &mut book, 1, Side::Ask, 101, 2);

        let trades = market(&mut engine, &mut book, 2, Side::Bid, 10);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 2);
        assert_eq!(book.best_bid(), None, "residual must not rest");
        assert_eq!(*engine.diagnostics().get(&Diagnostic::ExhaustedBook).unwrap(), 1);
    }

    #[test]
    fn cancel_replace_skips_crossing_side_only() {
        let mut book = OrderBook::new();
        let mut engine = MatchingEngine::new();
        limit(&mut engine, &mut book, 1, Side::Ask, 101, 5);

        // A refresh whose bid would cross the resting ask at 101 should
        // still place the (non-crossing) ask side.
        engine.apply(
            &mut book,
            Event::QuoteRefresh {
                old_bid: None,
                old_ask: None,
                new_bid: (10, 105, 3),
                new_ask: (11, 110, 3),
            },
            0,
        );
        assert_eq!(
            *engine.diagnostics().get(&Diagnostic::CrossedQuote).unwrap(),
            1
        );
        assert_eq!(book.best_ask(), Some((101, 5)));
        assert_eq!(book.depth(Side::Ask, 110), 3);
    }
}
