//! Requires both today's volume and a cached `avg20d`; rejects
//! `rvol < minRvol` and `rvol > maxRvol` (a data-quality trap, spec.md
//! §4.6.6). Division guarded by `avg20d > 0`.

use std::collections::HashMap;

use super::SymbolSnapshot;
use crate::config::Config;
use crate::stage_tracer::StageTracer;

pub struct RvolSurvivor {
    pub symbol: String,
    pub snapshot: crate::types::Snapshot,
    pub rvol: f64,
}

pub fn rvol_filter(
    input: Vec<SymbolSnapshot>,
    avg20d_by_symbol: &HashMap<String, f64>,
    cfg: &Config,
    tracer: &mut StageTracer,
) -> Vec<RvolSurvivor> {
    tracer.enter("RvolFilter", input.len());
    let mut kept = Vec::with_capacity(input.len());

    for item in input {
        let avg20d = match avg20d_by_symbol.get(&item.symbol) {
            Some(&v) if v > 0.0 => v,
            _ => {
                tracer.reject(&item.symbol, "missing_volume_average", None);
                continue;
            }
        };

        let rvol = item.snapshot.volume / avg20d;

        if rvol < cfg.rvol.min_rvol {
            tracer.reject(&item.symbol, "rvol_too_low", Some(format!("{rvol:.3}")));
        } else if rvol > cfg.rvol.max_rvol {
            tracer.reject(&item.symbol, "rvol_data_quality_trap", Some(format!("{rvol:.3}")));
        } else {
            kept.push(RvolSurvivor {
                symbol: item.symbol,
                snapshot: item.snapshot,
                rvol,
            });
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

    fn snap(symbol: &str, volume: f64) -> SymbolSnapshot {
        SymbolSnapshot {
            symbol: symbol.to_string(),
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
    fn rvol_exactly_at_minimum_is_kept() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let mut avgs = HashMap::new();
        avgs.insert("X".to_string(), 1_000_000.0);
        let out = rvol_filter(
            vec![snap("X", cfg.rvol.min_rvol * 1_000_000.0)],
            &avgs,
            &cfg,
            &mut tracer,
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn rvol_just_below_minimum_is_rejected() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let mut avgs = HashMap::new();
        avgs.insert("X".to_string(), 1_000_000.0);
        let out = rvol_filter(
            vec![snap("X", (cfg.rvol.min_rvol - 0.01) * 1_000_000.0)],
            &avgs,
            &cfg,
            &mut tracer,
        );
        assert_eq!(out.len(), 0);
    }

    #[test]
    fn rvol_above_max_is_data_quality_rejected() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let mut avgs = HashMap::new();
        avgs.insert("X".to_string(), 1_000.0);
        let out = rvol_filter(
            vec![snap("X", (cfg.rvol.max_rvol + 1.0) * 1_000.0)],
            &avgs,
            &cfg,
            &mut tracer,
        );
        assert_eq!(out.len(), 0);
        assert_eq!(tracer.trace().stages[0].rejections["rvol_data_quality_trap"], 1);
    }

    #[test]
    fn missing_average_is_rejected_not_defaulted() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let avgs = HashMap::new();
        let out = rvol_filter(vec![snap("X", 5_000_000.0)], &avgs, &cfg, &mut tracer);
        assert_eq!(out.len(), 0);
        assert_eq!(tracer.trace().stages[0].rejections["missing_volume_average"], 1);
    }

    #[test]
    fn zero_average_is_never_divided_by() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let mut avgs = HashMap::new();
        avgs.insert("X".to_string(), 0.0);
        let out = rvol_filter(vec![snap("X", 5_000_000.0)], &avgs, &cfg, &mut tracer);
        assert_eq!(out.len(), 0);
    }
}
