//! Seeded exogenous order flow, including the informed cohort that gives
//! the simulator its "toxic" flow for adverse-selection studies.
//!
//! Everything here draws from one [`StdRng`], seeded once from
//! [`SimConfig::seed`] and carried by value — never a hidden thread-local
//! generator — so two runs built from identical config replay
//! bit-for-bit. Per event, the draw order is always: evolve the latent
//! signal, then type, side, size, price offset, informed-override. That
//! order never changes regardless of which branch ends up taken, so a
//! config tweak to (say) `flow_probs` doesn't reshuffle the rest of the
//! stream.

use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tracing::trace;

use crate::DEFAULT_REFERENCE_PRICE;
use crate::config::{OffsetDist, SimConfig, SizeDist};
use crate::orderbook::Snapshot;
use crate::orders::{Event, IdAllocator, Side};

/// How many of the flow generator's own resting order ids it remembers as
/// cancel targets. Cancelling an id that has since been filled is a
/// harmless no-op, so this doesn't need to be exact — just bounded.
const LIVE_ID_HISTORY: usize = 128;

/// How far each new limit order's reference price moves from the book's
/// currently observed mid towards the latent fundamental anchor. Small and
/// fixed, so the book's emergent mid tracks `F_t` with slow adaptation
/// (spec.md §4.4) rather than jumping straight to it.
const FUNDAMENTAL_ADAPTATION: f64 = 0.1;

pub struct FlowGenerator {
    rng: StdRng,
    config: SimConfig,
    /// Latent informed signal s_t, mean-reverting towards zero.
    signal: f64,
    /// Slow-moving fundamental mid F_t (resolves spec open question (c)).
    fundamental: f64,
    live_ids: VecDeque<u64>,
}

impl FlowGenerator {
    pub fn new(config: SimConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            signal: 0.0,
            fundamental: 0.0,
            live_ids: VecDeque::with_capacity(LIVE_ID_HISTORY),
        }
    }

    /// Current value of the latent signal, exposed for tests only — the
    /// market maker never sees this.
    #[cfg(test)]
    pub(crate) fn signal(&self) -> f64 {
        self.signal
    }

    fn evolve_signal(&mut self) {
        let innovation = Normal::new(0.0, 1.0).unwrap().sample(&mut self.rng);
        self.signal += self.config.signal_mean_reversion * (0.0 - self.signal) + innovation;
        self.fundamental += self.config.fundamental_beta * self.signal;
    }

    fn p_buy_at(&self, event_index: u64) -> f64 {
        self.config
            .imbalance_schedule
            .as_ref()
            .and_then(|s| s.p_buy_at(event_index))
            .unwrap_or(self.config.p_buy)
    }

    fn draw_size(&mut self) -> u64 {
        match self.config.size_dist {
            SizeDist::Uniform { low, high } => self.rng.random_range(low..=high),
            SizeDist::Exponential { mean } => {
                let unit: f64 = rand_distr::Exp1.sample(&mut self.rng);
                (unit * mean).max(1.0).round() as u64
            }
        }
    }

    fn draw_offset(&mut self) -> f64 {
        match self.config.price_offset_dist {
            OffsetDist::Uniform { low, high } => self.rng.random_range(low..=high) as f64,
            OffsetDist::Normal { mean, std_dev } => {
                Normal::new(mean, std_dev).unwrap().sample(&mut self.rng)
            }
        }
    }

    /// Reference price new limit orders are offset from. This is where
    /// `F_t` actually feeds back into the simulation: the observed book
    /// mid is pulled a small fixed fraction of the way towards the latent
    /// fundamental anchor, so resting liquidity (and therefore the book's
    /// own emergent mid) drifts towards `F_t` over many ticks instead of
    /// the fundamental being computed and never consulted.
    fn reference_mid(&self, snapshot: &Snapshot) -> f64 {
        let anchor = DEFAULT_REFERENCE_PRICE + self.fundamental;
        let observed = snapshot
            .mid
            .or(snapshot.bid_price.map(|p| p as f64))
            .or(snapshot.ask_price.map(|p| p as f64));
        match observed {
            Some(mid) => mid + FUNDAMENTAL_ADAPTATION * (anchor - mid),
            None => anchor,
        }
    }

    fn remember(&mut self, id: u64) {
        if self.live_ids.len() == LIVE_ID_HISTORY {
            self.live_ids.pop_front();
        }
        self.live_ids.push_back(id);
    }

    /// Produces the next exogenous event. `ids` is the id allocator shared
    /// with the market maker; `snapshot` is the book's current top-of-book
    /// (the reference price for limit offsets).
    pub fn next_event(&mut self, ids: &mut IdAllocator, snapshot: &Snapshot, event_index: u64) -> Event {
        self.evolve_signal();

        let type_draw: f64 = self.rng.random();
        let is_limit = type_draw < self.config.flow_probs.limit;
        let is_market = !is_limit && type_draw < self.config.flow_probs.limit + self.config.flow_probs.market;

        let p_buy = self.p_buy_at(event_index);
        let mut side = if self.rng.random_bool(p_buy.clamp(0.0, 1.0)) { Side::Bid } else { Side::Ask };

        let qty = self.draw_size();
        let offset = self.draw_offset();
        let informed_trigger = self.rng.random_bool(self.config.p_informed.clamp(0.0, 1.0));

        if is_market && informed_trigger && self.signal.abs() > self.config.signal_tau {
            side = if self.signal > 0.0 { Side::Bid } else { Side::Ask };
            trace!(signal = self.signal, ?side, "informed order forced side");
        }

        if is_limit {
            let id = ids.next_id();
            let ref_price = self.reference_mid(snapshot);
            let mut price = (ref_price + offset).round() as i64;
            price = match side {
                Side::Bid => match snapshot.ask_price {
                    Some(ask) => price.min(ask - 1),
                    None => price,
                },
                Side::Ask => match snapshot.bid_price {
                    Some(bid) => price.max(bid + 1),
                    None => price,
                },
            };
            self.remember(id);
            Event::LimitOrder { id, side, price, qty }
        } else if is_market {
            let id = ids.next_id();
            Event::MarketOrder { id, side, qty }
        } else {
            let id = self
                .live_ids
                .get((qty as usize) % self.live_ids.len().max(1))
                .copied()
                .unwrap_or(u64::MAX);
            Event::Cancel { id }
        }
    }
}
