use thiserror::Error;

/// The only fatal error kind. Raised once, before the first event, by
/// [`crate::config::SimConfig::validate`]. Every other condition the engine
/// or agents encounter during a run is recoverable and recorded instead
/// (see [`Diagnostic`]).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("flow_probs must sum to 1.0, got {0}")]
    ProbabilitiesDontSum(String),
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: i64 },
    #[error("mm_refresh_k must be > 0, got {0}")]
    NonPositiveRefreshCadence(i64),
    #[error("p_informed must be in [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),
}

/// A recoverable runtime condition, recorded as a counter in the
/// diagnostics stream rather than propagated as an `Err`. The simulation
/// never aborts mid-run over any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    /// A raw `OrderBook::insert` would have crossed the book; the caller
    /// should have routed the order through the matching engine instead.
    CrossedRest,
    /// `cancel` was called with an id that is not currently resting.
    NotFound,
    /// A market order could not be fully filled; the residual was dropped.
    ExhaustedBook,
    /// A market maker quote would have crossed the opposing book; that
    /// side was skipped for this refresh.
    CrossedQuote,
}
