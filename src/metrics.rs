//! Per-event and per-trade record streams, plus the markout and summary
//! diagnostics built from them. Everything here is in-memory; handing
//! these streams to a CSV writer, a plotting library, or an experiment
//! bundle is a collaborator's job, not this crate's.

use crate::orders::{Event, Side};
use crate::trade::Trade;

/// Which branch of [`crate::orders::Event`] produced a given
/// [`EventRecord`], recorded for downstream analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Limit,
    Market,
    Cancel,
    QuoteRefresh,
}

impl From<&Event> for EventKind {
    fn from(event: &Event) -> Self {
        match event {
            Event::LimitOrder { .. } => EventKind::Limit,
            Event::MarketOrder { .. } => EventKind::Market,
            Event::Cancel { .. } => EventKind::Cancel,
            Event::QuoteRefresh { .. } => EventKind::QuoteRefresh,
        }
    }
}

/// One row of the per-event diagnostics stream, described in spec.md §4.6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub sequence: u64,
    pub time: u64,
    pub best_bid: Option<i64>,
    pub best_ask: Option<i64>,
    pub mid: Option<f64>,
    pub spread: Option<i64>,
    pub inventory: i64,
    pub cash: i64,
    pub mtm_pnl: f64,
    pub last_trade_price: Option<i64>,
    pub event_type: EventKind,
}

/// A trade annotated with whether the market maker was the maker side of
/// it, so the maker-fill subset of the trade stream doesn't need a second
/// pass over the maker's id history.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub trade: Trade,
    pub mm_involved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub final_mtm_pnl: f64,
    pub realized_pnl: f64,
    pub trade_count: usize,
    pub maker_fill_count: usize,
    pub avg_spread: f64,
    pub avg_abs_inventory: f64,
    pub avg_markout: f64,
    pub adverse_fill_ratio: f64,
}

#[derive(Default)]
pub struct MetricsCollector {
    pub events: Vec<EventRecord>,
    pub trades: Vec<TradeRecord>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self, record: EventRecord) {
        self.events.push(record);
    }

    pub fn record_trades(&mut self, trades: Vec<TradeRecord>) {
        self.trades.extend(trades);
    }

    pub fn maker_fills(&self) -> impl Iterator<Item = &TradeRecord> {
        self.trades.iter().filter(|t| t.mm_involved)
    }

    /// Looks up the event record stamped with logical time `time`. Vector
    /// position is not time: an on-cadence tick pushes a refresh record and
    /// an exogenous-event record at the same `time` (scheduler.rs), so
    /// position drifts ahead of time from the very first tick. `time` is
    /// non-decreasing across the stream, so a binary search on it is valid.
    fn event_at(&self, time: u64) -> Option<&EventRecord> {
        let idx = self.events.partition_point(|e| e.time < time);
        self.events.get(idx).filter(|e| e.time == time)
    }

    /// Signed markout at `horizon` events past the fill, one entry per
    /// maker fill whose `t + horizon` falls within the recorded event
    /// stream. Trailing fills near the end of the run are excluded rather
    /// than zero-filled, per spec.md §4.6.
    pub fn markouts(&self, horizon: u64) -> Vec<f64> {
        self.maker_fills()
            .filter_map(|record| {
                let target = record.trade.timestamp.checked_add(horizon)?;
                let mid_then = self.event_at(target)?.mid?;
                // The maker's side is the opposite of the aggressor that
                // hit it: if the taker sold (Ask), the maker bought (Bid).
                let maker_side = record.trade.aggressor_side.opposite();
                let sign = match maker_side {
                    Side::Bid => 1.0,
                    Side::Ask => -1.0,
                };
                Some((mid_then - record.trade.price as f64) * sign)
            })
            .collect()
    }

    pub fn summary(&self, markout_horizon: u64) -> Summary {
        let trade_count = self.trades.len();
        let maker_fill_count = self.maker_fills().count();

        let avg_spread = average(self.events.iter().filter_map(|e| e.spread).map(|s| s as f64));
        let avg_abs_inventory = average(self.events.iter().map(|e| e.inventory.unsigned_abs() as f64));

        let markouts = self.markouts(markout_horizon);
        let avg_markout = average(markouts.iter().copied());
        let adverse_fill_ratio = if markouts.is_empty() {
            0.0
        } else {
            markouts.iter().filter(|m| **m < 0.0).count() as f64 / markouts.len() as f64
        };

        let (final_mtm_pnl, realized_pnl) = self
            .events
            .last()
            .map(|e| (e.mtm_pnl, e.cash as f64))
            .unwrap_or((0.0, 0.0));

        Summary {
            final_mtm_pnl,
            realized_pnl,
            trade_count,
            maker_fill_count,
            avg_spread,
            avg_abs_inventory,
            avg_markout,
            adverse_fill_ratio,
        }
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(timestamp: u64, aggressor_side: Side, price: i64, qty: u64) -> Trade {
        Trade { sequence: 1, aggressor_side, price, quantity: qty, maker_id: 1, taker_id: 2, timestamp }
    }

    fn event(time: u64, mid: Option<f64>) -> EventRecord {
        EventRecord {
            sequence: time,
            time,
            best_bid: None,
            best_ask: None,
            mid,
            spread: None,
            inventory: 0,
            cash: 0,
            mtm_pnl: 0.0,
            last_trade_price: None,
            event_type: EventKind::Market,
        }
    }

    #[test]
    fn markout_sign_matches_maker_side_convention() {
        let mut metrics = MetricsCollector::new();
        for t in 0..5 {
            metrics.record_event(event(t, Some(100.0 + t as f64)));
        }
        // Aggressor sold (Ask) into the maker's bid at t=0, price 99.
        // Mid at t+2 is 102.0, so the maker (who bought) is up 3.0.
        metrics.record_trades(vec![TradeRecord {
            trade: trade(0, Side::Ask, 99, 1),
            mm_involved: true,
        }]);
        let markouts = metrics.markouts(2);
        assert_eq!(markouts, vec![3.0]);
    }

    #[test]
    fn markout_lookup_is_by_time_not_vector_position() {
        // A refresh tick pushes two records at the same `time` (the
        // refresh itself, then the exogenous event), so position runs
        // ahead of time from the very first tick.
        let mut metrics = MetricsCollector::new();
        metrics.record_event(event(0, Some(100.0))); // refresh at time 0
        metrics.record_event(event(0, Some(100.0))); // exogenous event at time 0
        metrics.record_event(event(1, Some(105.0))); // time 1, vector position 2

        metrics.record_trades(vec![TradeRecord {
            trade: trade(0, Side::Ask, 99, 1),
            mm_involved: true,
        }]);

        // Looking up by vector position (1) would read mid=100.0 instead
        // of the record actually stamped time=1 (mid=105.0).
        let markouts = metrics.markouts(1);
        assert_eq!(markouts, vec![6.0]);
    }

    #[test]
    fn trailing_fills_beyond_horizon_are_excluded() {
        let mut metrics = MetricsCollector::new();
        for t in 0..3 {
            metrics.record_event(event(t, Some(100.0)));
        }
        metrics.record_trades(vec![TradeRecord {
            trade: trade(2, Side::Bid, 100, 1),
            mm_involved: true,
        }]);
        assert!(metrics.markouts(5).is_empty());
    }

    #[test]
    fn adverse_fill_ratio_counts_negative_markouts() {
        let mut metrics = MetricsCollector::new();
        for t in 0..3 {
            metrics.record_event(event(t, Some(100.0)));
        }
        // Maker bought at 101, mid later drops to 100 -> markout negative.
        metrics.record_trades(vec![TradeRecord {
            trade: trade(0, Side::Ask, 101, 1),
            mm_involved: true,
        }]);
        let summary = metrics.summary(2);
        assert_eq!(summary.adverse_fill_ratio, 1.0);
    }
}
