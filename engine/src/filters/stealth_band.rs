//! The archetypal "pre-explosion" filter: keeps `MIN_DAILY_CHANGE ≤
//! changePct ≤ MAX_DAILY_CHANGE` (spec.md §4.6.4, defaults −10%/+5%,
//! inclusive bounds).

use super::SymbolSnapshot;
use crate::config::Config;
use crate::stage_tracer::StageTracer;

pub fn stealth_band(
    input: Vec<SymbolSnapshot>,
    cfg: &Config,
    tracer: &mut StageTracer,
) -> Vec<SymbolSnapshot> {
    tracer.enter("StealthBand", input.len());
    let mut kept = Vec::with_capacity(input.len());

    for item in input {
        let change = item.snapshot.change_pct;
        if change < cfg.stealth_band.min_daily_change {
            tracer.reject(&item.symbol, "change_too_negative", Some(format!("{change}")));
        } else if change > cfg.stealth_band.max_daily_change {
            tracer.reject(&item.symbol, "already_exploded_today", Some(format!("{change}")));
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

    fn snap(change_pct: f64) -> SymbolSnapshot {
        SymbolSnapshot {
            symbol: "X".into(),
            snapshot: Snapshot {
                price: 1.0,
                volume: 1.0,
                change_pct,
                high: 1.0,
                low: 1.0,
                prev_close: 1.0,
                as_of: Utc::now(),
            },
        }
    }

    #[test]
    fn max_change_exactly_is_kept() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let out = stealth_band(vec![snap(cfg.stealth_band.max_daily_change)], &cfg, &mut tracer);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn above_max_change_is_rejected_already_exploded() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let out = stealth_band(
            vec![snap(cfg.stealth_band.max_daily_change + 0.01)],
            &cfg,
            &mut tracer,
        );
        assert_eq!(out.len(), 0);
        assert_eq!(tracer.trace().stages[0].rejections["already_exploded_today"], 1);
    }

    #[test]
    fn below_min_change_is_rejected() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let out = stealth_band(
            vec![snap(cfg.stealth_band.min_daily_change - 0.01)],
            &cfg,
            &mut tracer,
        );
        assert_eq!(out.len(), 0);
    }
}
