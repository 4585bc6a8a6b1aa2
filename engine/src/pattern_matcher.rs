//! Similarity to a small, checked-in set of historical "winner" shapes
//! (spec.md §4.8). Three archetypes, no external training data — the
//! list is configuration, not a model.

use crate::types::PatternArchetype;

pub const ARCHETYPES: [PatternArchetype; 3] = [
    PatternArchetype {
        name: "low_float_squeeze",
        rvol: 8.0,
        price: 4.50,
        change_pct: 2.0,
        outcome_label: "multi_day_runner",
        weight: 1.0,
    },
    PatternArchetype {
        name: "stealth_accumulation",
        rvol: 3.0,
        price: 15.00,
        change_pct: 1.5,
        outcome_label: "breakout_continuation",
        weight: 1.0,
    },
    PatternArchetype {
        name: "high_rvol_reversal",
        rvol: 12.0,
        price: 1.20,
        change_pct: -3.0,
        outcome_label: "reversal_spike",
        weight: 1.0,
    },
];

/// `0.0..=1.0` similarity of a candidate against one archetype, weighted
/// 0.70 rvol / 0.20 price / 0.10 changePct and scaled by the archetype's
/// own weight (spec.md §4.8, formulas reproduced verbatim).
fn similarity(rvol: f64, price: f64, change_pct: f64, archetype: &PatternArchetype) -> f64 {
    let rvol_sim = rvol_similarity(rvol, archetype.rvol);
    let price_sim = price_similarity(price, archetype.price);
    let change_sim = change_similarity(change_pct, archetype.change_pct);

    (0.70 * rvol_sim + 0.20 * price_sim + 0.10 * change_sim) * archetype.weight
}

/// `max(0, 1 - |cand.rvol - arch.rvol| / max(cand.rvol, arch.rvol)) ^ 0.7`
fn rvol_similarity(cand_rvol: f64, arch_rvol: f64) -> f64 {
    let denom = cand_rvol.max(arch_rvol);
    if denom <= 0.0 {
        return 0.0;
    }
    (1.0 - (cand_rvol - arch_rvol).abs() / denom).max(0.0).powf(0.7)
}

/// `(min(price, price) / max(price, price)) ^ 0.5` when both prices are
/// positive, else `0.0` — never divides by a non-positive price.
fn price_similarity(cand_price: f64, arch_price: f64) -> f64 {
    if cand_price <= 0.0 || arch_price <= 0.0 {
        return 0.0;
    }
    (cand_price.min(arch_price) / cand_price.max(arch_price)).powf(0.5)
}

/// `max(0, 1 - |cand.changePct - arch.changePct| / 5.0)`
fn change_similarity(cand_change_pct: f64, arch_change_pct: f64) -> f64 {
    (1.0 - (cand_change_pct - arch_change_pct).abs() / 5.0).max(0.0)
}

/// Best match across all archetypes plus its bonus-point tier (spec.md
/// §4.8: ≥0.85 → +15, ≥0.75 → +10, ≥0.65 → +5, else 0).
pub fn best_match(rvol: f64, price: f64, change_pct: f64) -> (f64, f64) {
    let best = ARCHETYPES
        .iter()
        .map(|a| similarity(rvol, price, change_pct, a))
        .fold(0.0_f64, f64::max);

    let bonus = if best >= 0.85 {
        15.0
    } else if best >= 0.75 {
        10.0
    } else if best >= 0.65 {
        5.0
    } else {
        0.0
    };

    (best, bonus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_archetype_match_scores_one() {
        let a = &ARCHETYPES[0];
        let sim = similarity(a.rvol, a.price, a.change_pct, a);
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn exact_match_earns_top_bonus_tier() {
        let a = &ARCHETYPES[0];
        let (sim, bonus) = best_match(a.rvol, a.price, a.change_pct);
        assert!(sim >= 0.85);
        assert_eq!(bonus, 15.0);
    }

    #[test]
    fn far_off_values_earn_no_bonus() {
        let (_sim, bonus) = best_match(0.01, 5000.0, 0.0);
        assert_eq!(bonus, 0.0);
    }

    #[test]
    fn price_similarity_is_symmetric() {
        assert_eq!(price_similarity(2.0, 8.0), price_similarity(8.0, 2.0));
    }

    #[test]
    fn non_positive_price_never_matches() {
        assert_eq!(price_similarity(0.0, 5.0), 0.0);
        assert_eq!(price_similarity(-1.0, 5.0), 0.0);
    }

    #[test]
    fn change_similarity_decays_past_five_points() {
        assert_eq!(change_similarity(0.0, 5.0), 0.0);
        assert!(change_similarity(0.0, 10.0) <= 0.0);
    }

    #[test]
    fn similarity_always_bounded_unit_interval() {
        let (sim, _) = best_match(50.0, 0.01, 90.0);
        assert!((0.0..=1.0).contains(&sim));
    }
}
