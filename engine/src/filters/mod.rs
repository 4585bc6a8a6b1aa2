//! The six ordered gates of spec.md §4.6. Each stage is a pure function
//! over the previous stage's survivors; each rejection records a concrete
//! reason string into the [`crate::stage_tracer::StageTracer`].

mod liquidity_floor;
mod post_explosion;
mod price_band;
mod rvol_filter;
mod stealth_band;
mod type_filter;

pub use liquidity_floor::liquidity_floor;
pub use post_explosion::{post_explosion_gate, SymbolHistory};
pub use price_band::price_band;
pub use rvol_filter::{rvol_filter, RvolSurvivor};
pub use stealth_band::stealth_band;
pub use type_filter::type_filter;

use serde::{Deserialize, Serialize};

use crate::types::Snapshot;

/// A snapshot still carrying its symbol, threaded through every filter
/// stage until the pipeline hands survivors to [`crate::momentum`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub snapshot: Snapshot,
}
