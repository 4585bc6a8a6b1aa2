//! Applied after a bounded fan-out fetches 5- and 20-day closes for
//! survivors (spec.md §4.6.5, §9 — ancillary data computed before the
//! stage, not fetched inside it). Missing history means "allow"; never
//! synthesized.

use std::collections::HashMap;

use super::SymbolSnapshot;
use crate::config::Config;
use crate::stage_tracer::StageTracer;

/// Ancillary per-symbol history gathered ahead of this stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolHistory {
    pub change_5d: Option<f64>,
    pub change_20d: Option<f64>,
}

pub fn post_explosion_gate(
    input: Vec<SymbolSnapshot>,
    history: &HashMap<String, SymbolHistory>,
    cfg: &Config,
    tracer: &mut StageTracer,
) -> Vec<SymbolSnapshot> {
    tracer.enter("PostExplosionGate", input.len());
    let mut kept = Vec::with_capacity(input.len());

    for item in input {
        let h = history.get(&item.symbol).copied().unwrap_or_default();

        let too_far_5d = h
            .change_5d
            .map(|c| c > cfg.post_explosion.max_change_5d)
            .unwrap_or(false);
        let too_far_20d = h
            .change_20d
            .map(|c| c > cfg.post_explosion.max_change_20d)
            .unwrap_or(false);

        if too_far_5d {
            tracer.reject(&item.symbol, "already_ran_5d", h.change_5d.map(|c| c.to_string()));
        } else if too_far_20d {
            tracer.reject(&item.symbol, "already_ran_20d", h.change_20d.map(|c| c.to_string()));
        } else {
            kept.push(item);
        }
    }

    tracer.exit(kept.len());
    kept
}
