use crate::orders::{OrderId, Side};

/// A matched transaction between a resting maker order and an incoming
/// taker order.
///
/// - `price` is always the maker's (resting) price, never the aggressor's
///   limit price.
/// - `timestamp` is the logical event index the trade occurred on, not a
///   wall-clock time — the whole simulation is driven off one monotonic
///   event counter so runs replay bit-for-bit from a seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub sequence: u64,
    pub aggressor_side: Side,
    pub price: i64,
    pub quantity: u64,
    pub maker_id: OrderId,
    pub taker_id: OrderId,
    pub timestamp: u64,
}
