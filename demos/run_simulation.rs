//! Minimal demonstration of driving the simulator end to end.
//!
//! This is a Cargo example, not a binary: the crate has no `[[bin]]`
//! target because argv parsing, config-file loading, and writing the
//! output streams to disk are all collaborator concerns, not this
//! crate's. Run with `cargo run --example run_simulation`.

use lob_microsim::config::{FlowProbabilities, OffsetDist, SimConfig, SizeDist};

fn main() {
    tracing_subscriber::fmt::init();

    let config = SimConfig {
        seed: 20260101,
        n_events: 20_000,
        tick_size: 1,
        lot_size: 1,
        mm_refresh_k: 5,
        mm_half_spread: 2.0,
        mm_inventory_widen_alpha: 0.5,
        mm_skew_beta: 0.3,
        mm_quote_size: 10,
        flow_probs: FlowProbabilities { limit: 0.55, market: 0.30, cancel: 0.15 },
        p_buy: 0.5,
        imbalance_schedule: None,
        p_informed: 0.15,
        signal_tau: 0.6,
        signal_mean_reversion: 0.08,
        info_horizon: 50,
        fundamental_beta: 0.04,
        price_offset_dist: OffsetDist::Normal { mean: 0.0, std_dev: 3.0 },
        size_dist: SizeDist::Exponential { mean: 5.0 },
        markout_horizon: 50,
    };

    let output = lob_microsim::run(config).expect("config is hardcoded and valid");

    println!("events processed: {}", output.events.len());
    println!("trades: {}", output.summary.trade_count);
    println!("maker fills: {}", output.summary.maker_fill_count);
    println!("final mark-to-market PnL: {:.2}", output.summary.final_mtm_pnl);
    println!("realized PnL (cash): {:.2}", output.summary.realized_pnl);
    println!("average spread: {:.3}", output.summary.avg_spread);
    println!("average |inventory|: {:.3}", output.summary.avg_abs_inventory);
    println!("average markout @ {} events: {:.4}", 50, output.summary.avg_markout);
    println!("adverse fill ratio: {:.3}", output.summary.adverse_fill_ratio);
    println!("diagnostics: {:?}", output.diagnostics);
}
