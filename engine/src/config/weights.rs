//! Scorer weights, preset overlay, and normalization.
//!
//! Ported from `original_source/backend/src/jobs/discover.py`'s
//! `_normalize_weights` / `_resolve_hybrid_weights`: a named preset's
//! weights overlay the base weights key-by-key, then the merged map is
//! normalized to sum to 1.0. Defaults below are spec.md §4.9's table,
//! checked in rather than inferred.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoringWeights {
    pub momentum: f64,
    pub rvol: f64,
    pub catalyst: f64,
    pub price: f64,
    pub change_pct: f64,
    pub short_interest: f64,
    pub borrow_rate: f64,
    pub float_shares: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            momentum: 0.25,
            rvol: 0.25,
            catalyst: 0.20,
            price: 0.10,
            change_pct: 0.10,
            short_interest: 0.05,
            borrow_rate: 0.05,
            float_shares: 0.05,
        }
    }
}

impl ScoringWeights {
    fn as_map(&self) -> HashMap<&'static str, f64> {
        HashMap::from([
            ("momentum", self.momentum),
            ("rvol", self.rvol),
            ("catalyst", self.catalyst),
            ("price", self.price),
            ("change_pct", self.change_pct),
            ("short_interest", self.short_interest),
            ("borrow_rate", self.borrow_rate),
            ("float_shares", self.float_shares),
        ])
    }

    fn from_map(m: &HashMap<&'static str, f64>) -> Self {
        Self {
            momentum: *m.get("momentum").unwrap_or(&0.0),
            rvol: *m.get("rvol").unwrap_or(&0.0),
            catalyst: *m.get("catalyst").unwrap_or(&0.0),
            price: *m.get("price").unwrap_or(&0.0),
            change_pct: *m.get("change_pct").unwrap_or(&0.0),
            short_interest: *m.get("short_interest").unwrap_or(&0.0),
            borrow_rate: *m.get("borrow_rate").unwrap_or(&0.0),
            float_shares: *m.get("float_shares").unwrap_or(&0.0),
        }
    }
}

/// Normalize a weight map so its values sum to 1.0. Negative weights are
/// clamped to zero first, matching the Python original's `max(0.0, v)`.
pub fn normalize_weights(weights: &ScoringWeights) -> ScoringWeights {
    let map = weights.as_map();
    let total: f64 = map.values().map(|v| v.max(0.0)).sum();
    let total = if total <= 0.0 { 1.0 } else { total };
    let normalized: HashMap<&'static str, f64> =
        map.into_iter().map(|(k, v)| (k, v.max(0.0) / total)).collect();
    ScoringWeights::from_map(&normalized)
}

/// Overlay a named preset's weights over the base weights, then
/// normalize. Unknown preset names fall back to the base weights
/// unchanged (never an error — a missing preset degrades to defaults,
/// same philosophy as AdaptiveParameters' fallback).
pub fn resolve_preset(
    base: &ScoringWeights,
    presets: &HashMap<String, ScoringWeights>,
    preset_name: Option<&str>,
) -> ScoringWeights {
    let merged = match preset_name.and_then(|name| presets.get(name)) {
        Some(preset) => overlay(base, preset),
        None => *base,
    };
    normalize_weights(&merged)
}

fn overlay(base: &ScoringWeights, preset: &ScoringWeights) -> ScoringWeights {
    let mut base_map = base.as_map();
    for (k, v) in preset.as_map() {
        base_map.insert(k, v);
    }
    ScoringWeights::from_map(&base_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_already_sum_to_one() {
        let w = ScoringWeights::default();
        let n = normalize_weights(&w);
        let sum = n.momentum
            + n.rvol
            + n.catalyst
            + n.price
            + n.change_pct
            + n.short_interest
            + n.borrow_rate
            + n.float_shares;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_rescales_nonunit_sum() {
        let w = ScoringWeights {
            momentum: 1.0,
            rvol: 1.0,
            catalyst: 0.0,
            price: 0.0,
            change_pct: 0.0,
            short_interest: 0.0,
            borrow_rate: 0.0,
            float_shares: 0.0,
        };
        let n = normalize_weights(&w);
        assert!((n.momentum - 0.5).abs() < 1e-9);
        assert!((n.rvol - 0.5).abs() < 1e-9);
    }

    #[test]
    fn negative_weights_clamp_to_zero() {
        let w = ScoringWeights {
            momentum: -1.0,
            rvol: 1.0,
            catalyst: 0.0,
            price: 0.0,
            change_pct: 0.0,
            short_interest: 0.0,
            borrow_rate: 0.0,
            float_shares: 0.0,
        };
        let n = normalize_weights(&w);
        assert_eq!(n.momentum, 0.0);
        assert_eq!(n.rvol, 1.0);
    }

    #[test]
    fn unknown_preset_falls_back_to_base() {
        let base = ScoringWeights::default();
        let presets = HashMap::new();
        let resolved = resolve_preset(&base, &presets, Some("does_not_exist"));
        assert_eq!(resolved, normalize_weights(&base));
    }

    #[test]
    fn known_preset_overlays_only_named_fields() {
        let base = ScoringWeights::default();
        let mut presets = HashMap::new();
        presets.insert(
            "aggressive".to_string(),
            ScoringWeights {
                momentum: 0.50,
                ..base
            },
        );
        let resolved = resolve_preset(&base, &presets, Some("aggressive"));
        // momentum share grew relative to the others after normalization.
        assert!(resolved.momentum > base.momentum / (base.momentum + base.rvol + base.catalyst + base.price + base.change_pct + base.short_interest + base.borrow_rate + base.float_shares));
    }
}
