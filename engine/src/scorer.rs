//! Eight-factor weighted score (spec.md §4.9). Pure, synchronous,
//! deterministic: every factor is normalized to `0.0..=1.0`, weighted by
//! [`crate::config::ScoringWeights`] (already normalized to sum to 1.0 at
//! config load), then blended with the pattern-match bonus and capped.

use crate::config::{Config, ScoringWeights};
use crate::types::ActionTag;

/// Optional enrichment inputs, fetched from [`crate::feature_cache::FeatureCache`]
/// ahead of scoring. A miss contributes `0.0` to its factor rather than a
/// fabricated neutral value — spec.md's "never synthesize" rule applies
/// here as much as it does to market data.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichmentInputs {
    pub catalyst_score: Option<f64>,
    pub short_interest: Option<f64>,
    pub float_shares: Option<f64>,
    pub borrow_rate: Option<f64>,
}

pub struct ScorerInput {
    pub price: f64,
    pub change_pct: f64,
    pub rvol: f64,
    pub momentum_score: f64,
    pub pattern_match: f64,
    pub pattern_bonus: f64,
    pub enrichment: EnrichmentInputs,
}

pub struct ScoreOutput {
    pub base_probability: f64,
    pub explosion_probability: f64,
    pub action_tag: ActionTag,
}

// Normalization ranges are pinned verbatim by spec.md §4.9's table, not
// derived from the run's price/change-pct filter bands.
const MOMENTUM_RANGE: (f64, f64) = (0.0, 200.0);
const RVOL_RANGE: (f64, f64) = (1.0, 50.0);
const CATALYST_RANGE: (f64, f64) = (0.0, 100.0);
const PRICE_RANGE: (f64, f64) = (0.0, 50.0);
const CHANGE_PCT_RANGE: (f64, f64) = (0.0, 100.0);
const SHORT_INTEREST_RANGE: (f64, f64) = (0.0, 40.0);
const BORROW_RATE_RANGE: (f64, f64) = (0.0, 100.0);
const FLOAT_SHARES_RANGE: (f64, f64) = (0.0, 5e7);
const EXPLOSION_PROBABILITY_CAP: f64 = 95.0;
/// `ε` in `norm(x, lo, hi) = clamp01((x - lo) / (hi - lo + ε))` (spec.md §4.9).
const NORM_EPSILON: f64 = 1e-9;

fn norm(x: f64, lo: f64, hi: f64) -> f64 {
    ((x - lo) / (hi - lo + NORM_EPSILON)).clamp(0.0, 1.0)
}

pub fn score(input: &ScorerInput, cfg: &Config) -> ScoreOutput {
    let w: &ScoringWeights = &cfg.weights;

    let momentum_n = norm(input.momentum_score, MOMENTUM_RANGE.0, MOMENTUM_RANGE.1);
    let rvol_n = norm(input.rvol, RVOL_RANGE.0, RVOL_RANGE.1);
    // Missing optional inputs contribute 0, never a synthesized default.
    let catalyst_n = match input.enrichment.catalyst_score {
        Some(v) => norm(v, CATALYST_RANGE.0, CATALYST_RANGE.1),
        None => 0.0,
    };
    // Lower price scores higher ("price (inverse)" in spec.md's table).
    let price_n = 1.0 - norm(input.price, PRICE_RANGE.0, PRICE_RANGE.1);
    let change_n = norm(input.change_pct.abs(), CHANGE_PCT_RANGE.0, CHANGE_PCT_RANGE.1);
    let short_interest_n = match input.enrichment.short_interest {
        Some(v) => norm(v, SHORT_INTEREST_RANGE.0, SHORT_INTEREST_RANGE.1),
        None => 0.0,
    };
    let borrow_rate_n = match input.enrichment.borrow_rate {
        Some(v) => norm(v, BORROW_RATE_RANGE.0, BORROW_RATE_RANGE.1),
        None => 0.0,
    };
    // Smaller floats score higher ("float (inverse)" in spec.md's table); a
    // missing float contributes 0, same as every other absent optional.
    let float_shares_n = match input.enrichment.float_shares {
        Some(shares) => 1.0 - norm(shares, FLOAT_SHARES_RANGE.0, FLOAT_SHARES_RANGE.1),
        None => 0.0,
    };

    let base = w.momentum * momentum_n
        + w.rvol * rvol_n
        + w.catalyst * catalyst_n
        + w.price * price_n
        + w.change_pct * change_n
        + w.short_interest * short_interest_n
        + w.borrow_rate * borrow_rate_n
        + w.float_shares * float_shares_n;

    let base_probability = round1(base * 100.0);
    let explosion_probability =
        round1((base_probability + input.pattern_bonus).min(EXPLOSION_PROBABILITY_CAP));

    ScoreOutput {
        base_probability,
        explosion_probability,
        action_tag: ActionTag::from_probability(explosion_probability),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
