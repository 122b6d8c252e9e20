//! Order and event types shared by the book, the engine, and both agents.

/// Unique identifier for a resting or incoming order, drawn from a single
/// global counter so the matching engine can assert `maker_id != taker_id`.
pub type OrderId = u64;

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// The side an aggressor on `self` matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// A resting limit order. Prices are integer ticks; `arrival_sequence` is
/// the sole tiebreaker within a price level and is assigned by the book on
/// acceptance, never by the originator.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub price: i64,
    pub remaining_qty: u64,
    pub arrival_sequence: u64,
}

/// The single counter shared by the flow generator and the market maker so
/// every order in the simulation — regardless of which agent created it —
/// draws from the same id space. This is what lets the matching engine's
/// `maker_id != taker_id` self-trade guard mean anything.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: OrderId,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn next_id(&mut self) -> OrderId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// The tagged event variants the scheduler dispatches to the matching
/// engine. `QuoteRefresh` is the market maker's cancel-replace composite;
/// the old ids are `None` on the maker's first ever refresh.
#[derive(Debug, Clone)]
pub enum Event {
    LimitOrder {
        id: OrderId,
        side: Side,
        price: i64,
        qty: u64,
    },
    MarketOrder {
        id: OrderId,
        side: Side,
        qty: u64,
    },
    Cancel {
        id: OrderId,
    },
    QuoteRefresh {
        old_bid: Option<OrderId>,
        old_ask: Option<OrderId>,
        new_bid: (OrderId, i64, u64),
        new_ask: (OrderId, i64, u64),
    },
}
