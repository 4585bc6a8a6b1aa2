//! Fail-closed staleness check (spec.md §4.4), ported from
//! `original_source/backend/src/discovery/feature_store.py`'s
//! `get_features`: every `FeatureSet` is checked against per-session
//! thresholds, stale symbols are dropped, and the whole run fails
//! closed — returning nothing rather than a partial, possibly
//! misleading result — once the dropped fraction crosses
//! `max_stale_fraction`.

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::types::{Feature, FeatureSet, MarketSession, Source};

/// Session-scaled thresholds: premarket/afterhours data is inherently
/// sparser, so quote/bar staleness tolerances widen outside regular
/// hours (mirrors `feature_store.py::get_freshness_thresholds`).
fn session_multiplier(session: MarketSession) -> f64 {
    match session {
        MarketSession::Regular => 1.0,
        MarketSession::Premarket | MarketSession::Afterhours => 3.0,
        MarketSession::Closed => 10.0,
    }
}

/// A batch-sourced price/volume row's age is the time since the bulk
/// snapshot was taken, which includes *this run's own* post-explosion
/// and volume-average lookups — not just quote staleness. A live,
/// stream-sourced feature has no such pipeline delay baked into its age,
/// so it still uses the tight live-quote TTL. Picking the TTL by the
/// feature's own `source` (rather than a single blanket threshold) is
/// what keeps normal pipeline elapsed time from being mistaken for stale
/// market data.
fn critical_threshold(feature: &Feature<f64>, cfg: &Config, mult: f64) -> f64 {
    match feature.source {
        Source::Batch => cfg.freshness.snapshot_batch_secs * mult,
        Source::Stream | Source::Rest | Source::Derived => cfg.freshness.quotes_secs * mult,
    }
}

fn check_one(fs: &mut FeatureSet, cfg: &Config) {
    let mult = session_multiplier(fs.session);
    fs.freshness_failures.clear();

    if let Some(p) = &fs.price {
        if !p.is_fresh(critical_threshold(p, cfg, mult)) {
            fs.freshness_failures.push("price".to_string());
        }
    }
    if let Some(v) = &fs.volume {
        if !v.is_fresh(critical_threshold(v, cfg, mult)) {
            fs.freshness_failures.push("volume".to_string());
        }
    }
    if let Some(atm_iv) = &fs.atm_iv {
        if !atm_iv.is_fresh(cfg.freshness.options_secs * mult) {
            fs.freshness_failures.push("atm_iv".to_string());
        }
    }
    if let Some(si) = &fs.short_interest {
        if !si.is_fresh(cfg.freshness.short_interest_secs) {
            fs.freshness_failures.push("short_interest".to_string());
        }
    }

    // Only critical features (price, volume) fail the symbol outright;
    // a stale options/short-interest field just means that factor is
    // dropped from scoring further downstream.
    fs.is_fresh = !fs
        .freshness_failures
        .iter()
        .any(|f| cfg.is_critical_feature(f));
}

/// Returns the surviving, fresh `FeatureSet`s. On `Err`, the caller must
/// treat the whole run as failed — no partial survivors are usable once
/// the gate trips (spec.md §8 scenario 3).
pub fn apply(mut sets: Vec<FeatureSet>, cfg: &Config) -> EngineResult<Vec<FeatureSet>> {
    let total = sets.len();
    for fs in &mut sets {
        check_one(fs, cfg);
    }

    let stale = sets.iter().filter(|fs| !fs.is_fresh).count();
    let fraction = if total == 0 { 0.0 } else { stale as f64 / total as f64 };

    if fraction > cfg.max_stale_fraction {
        log::error!(
            "\u{1f6ab} FAIL-CLOSED: {stale}/{total} symbols stale ({fraction:.2} > {:.2} threshold)",
            cfg.max_stale_fraction
        );
        return Err(EngineError::StaleData {
            stale,
            total,
            threshold: cfg.max_stale_fraction,
        });
    }

    if stale > 0 {
        log::warn!("dropping {stale}/{total} stale symbols before scoring");
    }

    Ok(sets.into_iter().filter(|fs| fs.is_fresh).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_set(symbol: &str) -> FeatureSet {
        let mut fs = FeatureSet::new(symbol, MarketSession::Regular);
        fs.price = Some(Feature::new(10.0, Source::Rest, 0.1));
        fs.volume = Some(Feature::new(1_000.0, Source::Rest, 0.1));
        fs
    }

    fn stale_set(symbol: &str) -> FeatureSet {
        let mut fs = FeatureSet::new(symbol, MarketSession::Regular);
        fs.price = Some(Feature::new(10.0, Source::Rest, 999_999.0));
        fs.volume = Some(Feature::new(1_000.0, Source::Rest, 999_999.0));
        fs
    }

    #[test]
    fn fresh_sets_survive_untouched() {
        let cfg = Config::default();
        let out = apply(vec![fresh_set("A"), fresh_set("B")], &cfg).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn below_threshold_stale_symbols_are_dropped_not_failed() {
        let cfg = Config::default();
        // 1 of 10 stale = 10%, under the 40% default threshold.
        let mut sets: Vec<FeatureSet> = (0..9).map(|i| fresh_set(&format!("S{i}"))).collect();
        sets.push(stale_set("STALE"));
        let out = apply(sets, &cfg).unwrap();
        assert_eq!(out.len(), 9);
    }

    #[test]
    fn above_threshold_fails_closed_with_empty_result() {
        let cfg = Config::default();
        let sets = vec![stale_set("A"), stale_set("B"), fresh_set("C")];
        let err = apply(sets, &cfg).unwrap_err();
        match err {
            EngineError::StaleData { stale, total, .. } => {
                assert_eq!(stale, 2);
                assert_eq!(total, 3);
            }
            other => panic!("expected StaleData, got {other:?}"),
        }
    }

    #[test]
    fn non_critical_staleness_does_not_fail_the_symbol() {
        let cfg = Config::default();
        let mut fs = fresh_set("A");
        fs.short_interest = Some(Feature::new(5.0, Source::Rest, 999_999.0));
        let out = apply(vec![fs], &cfg).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].freshness_failures.contains(&"short_interest".to_string()));
    }

    /// A batch-sourced snapshot feature a few seconds old — typical of a
    /// run that spent time in the post-explosion/volume-average lookups
    /// between snapshotting and this gate — must not be mistaken for a
    /// stale live quote (regression: pipeline elapsed time tripping the
    /// 2s live-quote TTL would fail every regular-session run closed).
    #[test]
    fn batch_sourced_feature_tolerates_pipeline_elapsed_time() {
        let cfg = Config::default();
        let mut fs = FeatureSet::new("A", MarketSession::Regular);
        fs.price = Some(Feature::new(10.0, Source::Batch, 30.0));
        fs.volume = Some(Feature::new(1_000.0, Source::Batch, 30.0));
        let out = apply(vec![fs], &cfg).unwrap();
        assert_eq!(out.len(), 1);
    }

    /// But a batch feature old enough to have outlived even the generous
    /// batch TTL is still caught and dropped (kept under the fail-closed
    /// fraction by a majority of genuinely fresh batch symbols).
    #[test]
    fn batch_sourced_feature_still_fails_once_truly_stale() {
        let cfg = Config::default();
        let fresh_batch = |symbol: &str| {
            let mut fs = FeatureSet::new(symbol, MarketSession::Regular);
            fs.price = Some(Feature::new(10.0, Source::Batch, 30.0));
            fs.volume = Some(Feature::new(1_000.0, Source::Batch, 30.0));
            fs
        };
        let mut stale_one = fresh_batch("STALE");
        stale_one.price = Some(Feature::new(10.0, Source::Batch, 999_999.0));
        stale_one.volume = Some(Feature::new(1_000.0, Source::Batch, 999_999.0));

        let mut sets: Vec<FeatureSet> = (0..9).map(|i| fresh_batch(&format!("S{i}"))).collect();
        sets.push(stale_one);

        let out = apply(sets, &cfg).unwrap();
        assert_eq!(out.len(), 9);
    }
}
