//! Core data model: snapshots, features, candidates, traces, run results.
//!
//! Every record here is a plain struct. No stage reaches for a loose
//! `HashMap<String, serde_json::Value>` where a named field will do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the bulk market snapshot. Produced once per run by
/// [`crate::market_data::MarketDataClient::bulk_snapshot`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub price: f64,
    pub volume: f64,
    pub change_pct: f64,
    pub high: f64,
    pub low: f64,
    pub prev_close: f64,
    pub as_of: DateTime<Utc>,
}

/// A single OHLCV bar, ascending by `t`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HistoricalBar {
    pub t: DateTime<Utc>,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
}

/// A durable 20-day average-volume record. `avg20d > 0` is enforced at
/// insert time by [`crate::volume_store::VolumeAverageStore`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::FromRow)]
pub struct VolumeAverage {
    pub symbol: String,
    pub avg20d: f64,
    pub last_updated: DateTime<Utc>,
}

/// Where a [`Feature`] value came from. Stream sources get a confidence
/// boost applied at write time (see [`Feature::from_stream`]).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Source {
    Stream,
    Batch,
    Rest,
    Derived,
}

/// A value paired with its provenance: where it came from, how old it is,
/// and how much to trust it. Never a bare float floating around the
/// pipeline unaccompanied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Feature<T> {
    pub value: T,
    pub source: Source,
    pub age_seconds: f64,
    pub confidence: f64,
}

impl<T> Feature<T> {
    pub fn new(value: T, source: Source, age_seconds: f64) -> Self {
        let confidence = match source {
            // Live-stream sources get a confidence boost, capped at 1.0.
            Source::Stream => (1.0_f64 * 1.3).min(1.0),
            _ => 1.0,
        };
        Self {
            value,
            source,
            age_seconds,
            confidence,
        }
    }

    pub fn is_fresh(&self, ttl_seconds: f64) -> bool {
        self.age_seconds <= ttl_seconds
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MarketSession {
    Premarket,
    Regular,
    Afterhours,
    Closed,
}

/// Per-symbol feature bundle consumed by [`crate::freshness_gate::FreshnessGate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSet {
    pub symbol: String,
    pub price: Option<Feature<f64>>,
    pub volume: Option<Feature<f64>>,
    pub vwap: Option<Feature<f64>>,
    pub rel_vol: Option<Feature<f64>>,
    pub atr_pct: Option<Feature<f64>>,
    pub atm_iv: Option<Feature<f64>>,
    pub iv_percentile: Option<Feature<f64>>,
    pub call_put_ratio: Option<Feature<f64>>,
    pub short_interest: Option<Feature<f64>>,
    pub float_shares: Option<Feature<f64>>,
    pub freshness_failures: Vec<String>,
    pub is_fresh: bool,
    pub session: MarketSession,
}

impl FeatureSet {
    pub fn new(symbol: impl Into<String>, session: MarketSession) -> Self {
        Self {
            symbol: symbol.into(),
            price: None,
            volume: None,
            vwap: None,
            rel_vol: None,
            atr_pct: None,
            atm_iv: None,
            iv_percentile: None,
            call_put_ratio: None,
            short_interest: None,
            float_shares: None,
            freshness_failures: Vec::new(),
            is_fresh: true,
        session,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionTag {
    TradeReady,
    Monitor,
    Watchlist,
}

impl ActionTag {
    pub fn from_probability(p: f64) -> Self {
        if p >= 75.0 {
            ActionTag::TradeReady
        } else if p >= 60.0 {
            ActionTag::Monitor
        } else {
            ActionTag::Watchlist
        }
    }
}

/// Optional secondary diagnostic blended from 5d/10d/30d volume ratios.
/// Supplements `rvol`; never replaces it (spec requires `rvol = today /
/// avg20d` exactly).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct VolumeSpikeDetail {
    pub early: f64,
    pub confirmation: f64,
    pub traditional: f64,
    pub best: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    pub change_pct: f64,
    pub rvol: f64,
    pub momentum_score: f64,
    pub pattern_match: f64,
    pub base_probability: f64,
    pub explosion_probability: f64,
    pub action_tag: ActionTag,
    pub volume_spike_detail: Option<VolumeSpikeDetail>,
}

/// A fixed historical "winner" archetype. Configuration, not input data.
#[derive(Debug, Clone, Copy)]
pub struct PatternArchetype {
    pub name: &'static str,
    pub rvol: f64,
    pub price: f64,
    pub change_pct: f64,
    pub outcome_label: &'static str,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectSample {
    pub symbol: String,
    pub reason: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageRecord {
    pub name: String,
    pub in_count: usize,
    pub out_count: usize,
    pub rejections: std::collections::BTreeMap<String, usize>,
    pub samples: Vec<RejectSample>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTrace {
    pub stages: Vec<StageRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub reason: Option<String>,
    pub stale: Option<usize>,
    pub threshold: Option<f64>,
    pub snapshot_symbols: usize,
    pub dropped_missing_fields: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub candidates: Vec<Candidate>,
    pub stats: RunStats,
    pub trace: StageTrace,
    pub timestamp: DateTime<Utc>,
    pub strategy: String,
}

impl RunResult {
    /// An explanatory, empty result for fatal-for-run failures. Never
    /// fabricated data — see spec.md §7.
    pub fn empty(strategy: impl Into<String>, trace: StageTrace, reason: impl Into<String>) -> Self {
        Self {
            candidates: Vec::new(),
            stats: RunStats {
                reason: Some(reason.into()),
                ..Default::default()
            },
            trace,
            timestamp: Utc::now(),
            strategy: strategy.into(),
        }
    }
}
