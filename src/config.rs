//! In-memory simulation configuration. Building one from a file, argv, or
//! an experiment-bundle format is a collaborator's job; this crate only
//! validates the struct once a collaborator has built it.

use crate::errors::ConfigError;

/// Event-type mix the flow generator draws from; must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowProbabilities {
    pub limit: f64,
    pub market: f64,
    pub cancel: f64,
}

impl FlowProbabilities {
    fn sum(&self) -> f64 {
        self.limit + self.market + self.cancel
    }
}

/// Distribution for a limit order's price offset from mid, in ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffsetDist {
    Uniform { low: i64, high: i64 },
    Normal { mean: f64, std_dev: f64 },
}

/// Distribution for an order's quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeDist {
    Uniform { low: u64, high: u64 },
    Exponential { mean: f64 },
}

/// A piecewise-constant schedule of `p_buy` values keyed by event index,
/// for modeling arrival imbalance regimes independent of information.
#[derive(Debug, Clone, PartialEq)]
pub struct ImbalanceSchedule {
    /// `(event_index, p_buy)` pairs, sorted ascending by event index. The
    /// regime in effect at index `i` is the last entry whose index is `<= i`.
    pub breakpoints: Vec<(u64, f64)>,
}

impl ImbalanceSchedule {
    pub fn p_buy_at(&self, event_index: u64) -> Option<f64> {
        self.breakpoints
            .iter()
            .rev()
            .find(|(idx, _)| *idx <= event_index)
            .map(|(_, p)| *p)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub seed: u64,
    pub n_events: u64,
    pub tick_size: u64,
    pub lot_size: u64,

    pub mm_refresh_k: u64,
    pub mm_half_spread: f64,
    pub mm_inventory_widen_alpha: f64,
    pub mm_skew_beta: f64,
    pub mm_quote_size: u64,

    pub flow_probs: FlowProbabilities,
    pub p_buy: f64,
    pub imbalance_schedule: Option<ImbalanceSchedule>,

    pub p_informed: f64,
    pub signal_tau: f64,
    pub signal_mean_reversion: f64,
    pub info_horizon: u64,
    pub fundamental_beta: f64,

    pub price_offset_dist: OffsetDist,
    pub size_dist: SizeDist,

    /// Horizon (in events) at which fills are marked out for adverse
    /// selection diagnostics.
    pub markout_horizon: u64,
}

impl SimConfig {
    /// The one fatal validation path in the whole crate: everything else
    /// is recoverable at runtime and recorded as a [`crate::errors::Diagnostic`]
    /// counter instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.flow_probs.sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::ProbabilitiesDontSum(format!("{sum:.6}")));
        }
        if self.mm_refresh_k == 0 {
            return Err(ConfigError::NonPositiveRefreshCadence(0));
        }
        if self.mm_quote_size == 0 {
            return Err(ConfigError::NonPositive { field: "mm_quote_size", value: 0 });
        }
        if self.tick_size == 0 {
            return Err(ConfigError::NonPositive { field: "tick_size", value: 0 });
        }
        if self.lot_size == 0 {
            return Err(ConfigError::NonPositive { field: "lot_size", value: 0 });
        }
        if !(0.0..=1.0).contains(&self.p_informed) {
            return Err(ConfigError::ProbabilityOutOfRange(self.p_informed));
        }
        if !(0.0..=1.0).contains(&self.p_buy) {
            return Err(ConfigError::ProbabilityOutOfRange(self.p_buy));
        }
        match self.size_dist {
            SizeDist::Uniform { low, high } if low == 0 || high < low => {
                return Err(ConfigError::NonPositive { field: "size_dist", value: low as i64 });
            }
            SizeDist::Exponential { mean } if mean <= 0.0 => {
                return Err(ConfigError::NonPositive { field: "size_dist.mean", value: mean as i64 });
            }
            _ => {}
        }
        Ok(())
    }
}
