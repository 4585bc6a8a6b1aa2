//! Keeps `volume ≥ MIN_VOLUME` (spec.md §4.6.3, default 100,000).

use super::SymbolSnapshot;
use crate::config::Config;
use crate::stage_tracer::StageTracer;

pub fn liquidity_floor(
    input: Vec<SymbolSnapshot>,
    cfg: &Config,
    tracer: &mut StageTracer,
) -> Vec<SymbolSnapshot> {
    tracer.enter("LiquidityFloor", input.len());
    let mut kept = Vec::with_capacity(input.len());

    for item in input {
        if item.snapshot.volume < cfg.min_volume {
            tracer.reject(
                &item.symbol,
                "volume_too_low",
                Some(format!("{}", item.snapshot.volume)),
            );
        } else {
            kept.push(item);
        }
    }

    tracer.exit(kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Snapshot;
    use chrono::Utc;

    fn snap(volume: f64) -> SymbolSnapshot {
        SymbolSnapshot {
            symbol: "X".into(),
            snapshot: Snapshot {
                price: 1.0,
                volume,
                change_pct: 0.0,
                high: 1.0,
                low: 1.0,
                prev_close: 1.0,
                as_of: Utc::now(),
            },
        }
    }

    #[test]
    fn min_volume_exactly_is_kept() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let out = liquidity_floor(vec![snap(cfg.min_volume)], &cfg, &mut tracer);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn below_min_volume_is_rejected() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let out = liquidity_floor(vec![snap(cfg.min_volume - 1.0)], &cfg, &mut tracer);
        assert_eq!(out.len(), 0);
    }
}
