//! Keeps `MIN_PRICE ≤ price ≤ MAX_PRICE`, inclusive bounds (spec.md
//! §4.6.2, §8 boundary behaviors).

use super::SymbolSnapshot;
use crate::config::Config;
use crate::stage_tracer::StageTracer;

pub fn price_band(
    input: Vec<SymbolSnapshot>,
    cfg: &Config,
    tracer: &mut StageTracer,
) -> Vec<SymbolSnapshot> {
    tracer.enter("PriceBand", input.len());
    let mut kept = Vec::with_capacity(input.len());

    for item in input {
        let price = item.snapshot.price;
        if price < cfg.price_band.min_price {
            tracer.reject(&item.symbol, "price_too_low", Some(format!("{price}")));
        } else if price > cfg.price_band.max_price {
            tracer.reject(&item.symbol, "price_too_high", Some(format!("{price}")));
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

    fn snap(price: f64) -> SymbolSnapshot {
        SymbolSnapshot {
            symbol: "X".into(),
            snapshot: Snapshot {
                price,
                volume: 1.0,
                change_pct: 0.0,
                high: price,
                low: price,
                prev_close: price,
                as_of: Utc::now(),
            },
        }
    }

    #[test]
    fn min_price_exactly_is_kept() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let out = price_band(vec![snap(cfg.price_band.min_price)], &cfg, &mut tracer);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn just_below_min_price_is_rejected() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let out = price_band(vec![snap(cfg.price_band.min_price - 0.001)], &cfg, &mut tracer);
        assert_eq!(out.len(), 0);
        assert_eq!(tracer.trace().stages[0].rejections["price_too_low"], 1);
    }

    #[test]
    fn max_price_exactly_is_kept() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let out = price_band(vec![snap(cfg.price_band.max_price)], &cfg, &mut tracer);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn above_max_price_is_rejected() {
        let cfg = Config::default();
        let mut tracer = StageTracer::new();
        let out = price_band(vec![snap(cfg.price_band.max_price + 0.01)], &cfg, &mut tracer);
        assert_eq!(out.len(), 0);
        assert_eq!(tracer.trace().stages[0].rejections["price_too_high"], 1);
    }
}
