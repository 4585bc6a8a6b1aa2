//! Run configuration: one immutable record per run holding weights,
//! thresholds, TTLs, staleness policy, and feature flags. Presets overlay
//! onto base weights and are normalized once at load time so they always
//! sum to 1.0 (ported from `original_source`'s `_normalize_weights` /
//! `_resolve_hybrid_weights`).

mod settings;
mod weights;

pub use settings::Config;
pub use weights::{normalize_weights, resolve_preset, ScoringWeights};
