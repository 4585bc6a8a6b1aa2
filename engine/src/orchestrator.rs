//! Ties every collaborator together (spec.md §4.11): acquires the job
//! lock, runs the bulk snapshot through the filter/rank/score pipeline
//! in order, and always produces a `RunResult` — an empty, explanatory
//! one on any fatal-for-run failure, never a propagated panic.

use chrono_tz::Tz;
use dashmap::DashMap;
use futures::future::{abortable, AbortHandle};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adaptive_params::{AdaptiveParameters, DefaultAdaptiveParameters};
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::feature_cache::FeatureCache;
use crate::filters::{
    liquidity_floor, post_explosion_gate, price_band, stealth_band, type_filter, SymbolHistory,
    SymbolSnapshot,
};
use crate::filters::{rvol_filter, RvolSurvivor};
use crate::job_lock::JobLock;
use crate::market_data::{MarketDataClient, Timespan};
use crate::momentum;
use crate::pattern_matcher;
use crate::result_publisher::ResultPublisher;
use crate::scorer::{self, EnrichmentInputs, ScorerInput};
use crate::session;
use crate::stage_tracer::StageTracer;
use crate::types::{Candidate, Feature, FeatureSet, RunResult, RunStats, Source, StageTrace};
use crate::volume_store::VolumeAverageStore;

/// Locally tracks the abort handle for the in-flight run per strategy.
/// The Redis `JobLock` is the cross-process source of truth; this
/// registry just lets a same-process restart cancel a stuck prior run
/// immediately rather than waiting out its TTL, mirroring the teacher's
/// `once_cell::Lazy<DashMap<..>>` task registry in `services/scheduler.rs`.
static RUN_REGISTRY: Lazy<DashMap<String, AbortHandle>> = Lazy::new(DashMap::new);

pub struct DiscoveryOrchestrator {
    market_data: Arc<dyn MarketDataClient>,
    volume_store: VolumeAverageStore,
    job_lock: JobLock,
    publisher: ResultPublisher,
    adaptive: Arc<dyn AdaptiveParameters>,
    cfg: Config,
    exchange_tz: Tz,
}

impl DiscoveryOrchestrator {
    pub fn new(
        market_data: Arc<dyn MarketDataClient>,
        volume_store: VolumeAverageStore,
        job_lock: JobLock,
        publisher: ResultPublisher,
        adaptive: Arc<dyn AdaptiveParameters>,
        cfg: Config,
    ) -> Self {
        let exchange_tz = session::parse_exchange_tz(&cfg.exchange_timezone);
        Self {
            market_data,
            volume_store,
            job_lock,
            publisher,
            adaptive,
            cfg,
            exchange_tz,
        }
    }

    /// Convenience constructor when no learning service is configured.
    pub fn with_default_adaptive(
        market_data: Arc<dyn MarketDataClient>,
        volume_store: VolumeAverageStore,
        job_lock: JobLock,
        publisher: ResultPublisher,
        cfg: Config,
    ) -> Self {
        Self::new(
            market_data,
            volume_store,
            job_lock,
            publisher,
            Arc::new(DefaultAdaptiveParameters::default()),
            cfg,
        )
    }

    /// Cancels any previously registered run for this strategy, then runs
    /// a fresh one under `futures::future::abortable`.
    pub async fn run(self: Arc<Self>) -> RunResult {
        let strategy = self.cfg.strategy.clone();
        if let Some((_, prev)) = RUN_REGISTRY.remove(&strategy) {
            prev.abort();
        }

        let (task, handle) = abortable(self.clone().execute());
        RUN_REGISTRY.insert(strategy.clone(), handle);

        let result = match task.await {
            Ok(r) => r,
            Err(_aborted) => RunResult::empty(
                &strategy,
                StageTrace::default(),
                "run superseded by a newer invocation",
            ),
        };
        RUN_REGISTRY.remove(&strategy);
        result
    }

    async fn execute(self: Arc<Self>) -> RunResult {
        let mut tracer = StageTracer::new();
        let deadline = Instant::now() + self.cfg.global_deadline;

        let lock_key = format!("discovery/lock/{}", self.cfg.strategy);
        let lock = match self.job_lock.acquire(&lock_key, self.cfg.job_lock_ttl_secs).await {
            Ok(l) => l,
            Err(e) => {
                return RunResult::empty(&self.cfg.strategy, tracer.into_trace(), e.to_string())
            }
        };

        let outcome = self.run_pipeline(&mut tracer, deadline).await;
        let result = match outcome {
            Ok(r) => r,
            Err(e) => {
                log::error!("discovery run failed: {e}");
                match &e {
                    EngineError::StaleData { stale, total, threshold } => {
                        let mut r = RunResult::empty(
                            &self.cfg.strategy,
                            tracer.into_trace(),
                            "fail_closed_staleness",
                        );
                        r.stats.stale = Some(*stale);
                        r.stats.threshold = Some(*threshold);
                        r.stats.snapshot_symbols = *total;
                        r
                    }
                    EngineError::CacheEmpty => RunResult::empty(
                        &self.cfg.strategy,
                        tracer.into_trace(),
                        "cache_empty",
                    ),
                    other => RunResult::empty(&self.cfg.strategy, tracer.into_trace(), other.to_string()),
                }
            }
        };

        if let Err(e) = self.publisher.publish(&result).await {
            log::error!("failed to publish run result: {e}");
        }
        if let Err(e) = lock.release().await {
            log::warn!("failed to release job lock: {e}");
        }

        result
    }

    async fn run_pipeline(
        &self,
        tracer: &mut StageTracer,
        deadline: Instant,
    ) -> EngineResult<RunResult> {
        let snapshot_map = self.market_data.bulk_snapshot().await;
        if snapshot_map.is_empty() {
            return Err(EngineError::UpstreamUnavailable(
                "bulk snapshot returned no symbols".into(),
            ));
        }
        let snapshot_symbols = snapshot_map.len();

        let universe: Vec<SymbolSnapshot> = snapshot_map
            .into_iter()
            .map(|(symbol, snapshot)| SymbolSnapshot { symbol, snapshot })
            .collect();

        check_deadline(deadline)?;
        let survivors = type_filter(universe, &self.cfg.etf_name_substrings, tracer);
        let survivors = price_band(survivors, &self.cfg, tracer);
        let survivors = liquidity_floor(survivors, &self.cfg, tracer);
        let survivors = stealth_band(survivors, &self.cfg, tracer);

        check_deadline(deadline)?;
        let ranked = momentum::rank(survivors, self.cfg.momentum_top_n);
        let momentum_by_symbol: HashMap<String, f64> = ranked
            .iter()
            .map(|r| (r.symbol.clone(), r.momentum_score))
            .collect();
        let post_momentum: Vec<SymbolSnapshot> = ranked
            .into_iter()
            .map(|r| SymbolSnapshot {
                symbol: r.symbol,
                snapshot: r.snapshot,
            })
            .collect();

        check_deadline(deadline)?;
        let symbols: Vec<String> = post_momentum.iter().map(|s| s.symbol.clone()).collect();
        let history = self.fetch_post_explosion_history(&symbols).await;
        let post_explosion_survivors =
            post_explosion_gate(post_momentum, &history, &self.cfg, tracer);

        check_deadline(deadline)?;
        let rvol_symbols: Vec<String> = post_explosion_survivors
            .iter()
            .map(|s| s.symbol.clone())
            .collect();
        let staleness = chrono::Duration::hours(self.cfg.volume_average_staleness_hours);
        let avg20d_by_symbol = self
            .volume_store
            .get(&rvol_symbols, staleness)
            .await
            .unwrap_or_else(|e| {
                log::warn!("volume average lookup failed, treating all as missing: {e}");
                HashMap::new()
            });
        // A survivor set that got nothing back from the store at all is a
        // fatal-for-run cache-empty condition (spec.md §4.11/§7), distinct
        // from the ordinary case of a handful of symbols missing their
        // average — the latter is recovered per-symbol by `rvol_filter`.
        if !rvol_symbols.is_empty() && avg20d_by_symbol.is_empty() {
            return Err(EngineError::CacheEmpty);
        }
        let rvol_survivors =
            rvol_filter(post_explosion_survivors, &avg20d_by_symbol, &self.cfg, tracer);

        check_deadline(deadline)?;
        let feature_sets = self.build_feature_sets(&rvol_survivors);
        let fresh_sets = crate::freshness_gate::apply(feature_sets, &self.cfg)?;
        let fresh_symbols: std::collections::HashSet<String> =
            fresh_sets.into_iter().map(|fs| fs.symbol).collect();
        let rvol_survivors: Vec<RvolSurvivor> = rvol_survivors
            .into_iter()
            .filter(|s| fresh_symbols.contains(&s.symbol))
            .collect();

        check_deadline(deadline)?;
        let (weights, regime_threshold) = self.resolve_adaptive_weights().await;
        let mut scoring_cfg = self.cfg.clone();
        scoring_cfg.weights = weights;

        let mut candidates = self.score_survivors(
            rvol_survivors,
            &momentum_by_symbol,
            regime_threshold,
            &scoring_cfg,
        );

        candidates.sort_by(|a: &Candidate, b: &Candidate| {
            b.explosion_probability
                .partial_cmp(&a.explosion_probability)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.pattern_match
                        .partial_cmp(&a.pattern_match)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| b.rvol.partial_cmp(&a.rvol).unwrap_or(std::cmp::Ordering::Equal))
        });
        candidates.truncate(self.cfg.max_candidates);

        Ok(RunResult {
            candidates,
            stats: RunStats {
                reason: None,
                stale: None,
                threshold: None,
                snapshot_symbols,
                dropped_missing_fields: 0,
            },
            trace: tracer.trace().clone(),
            timestamp: chrono::Utc::now(),
            strategy: self.cfg.strategy.clone(),
        })
    }

    async fn fetch_post_explosion_history(
        &self,
        symbols: &[String],
    ) -> HashMap<String, SymbolHistory> {
        let client = self.market_data.clone();
        stream::iter(symbols.iter().cloned())
            .map(|symbol| {
                let client = client.clone();
                async move {
                    let bars = client.historical_bars(&symbol, Timespan::Day, 21).await;
                    let history = bars.map(|b| symbol_history_from_bars(&b)).unwrap_or_default();
                    (symbol, history)
                }
            })
            .buffer_unordered(self.cfg.fanout_concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }

    async fn resolve_adaptive_weights(&self) -> (crate::config::ScoringWeights, f64) {
        match self.adaptive.resolve(&self.cfg.strategy, &self.cfg.weights).await {
            Some(decision) if decision.confidence >= self.cfg.learning_min_confidence => {
                (decision.weights, decision.regime_threshold)
            }
            Some(decision) => {
                log::debug!(
                    "adaptive parameters confidence {} below {} threshold, ignoring",
                    decision.confidence,
                    self.cfg.learning_min_confidence
                );
                metrics::increment_counter!("adaptive_params_low_confidence_total");
                (self.cfg.weights, 0.0)
            }
            None => (self.cfg.weights, 0.0),
        }
    }

    fn build_feature_sets(&self, survivors: &[RvolSurvivor]) -> Vec<FeatureSet> {
        let session = session::current_session(chrono::Utc::now(), &self.exchange_tz);
        let cache = FeatureCache::global();
        let generous_window = Duration::from_secs(7 * 86_400);

        survivors
            .iter()
            .map(|s| {
                let mut fs = FeatureSet::new(&s.symbol, session);
                let age = (chrono::Utc::now() - s.snapshot.as_of)
                    .num_milliseconds()
                    .max(0) as f64
                    / 1000.0;
                fs.price = Some(Feature::new(s.snapshot.price, Source::Batch, age));
                fs.volume = Some(Feature::new(s.snapshot.volume, Source::Batch, age));

                if let Some(entry) = cache.read("atm_iv", &s.symbol, generous_window) {
                    fs.atm_iv = Some(as_feature(entry));
                }
                if let Some(entry) = cache.read("short_interest", &s.symbol, generous_window) {
                    fs.short_interest = Some(as_feature(entry));
                }
                fs
            })
            .collect()
    }

    fn score_survivors(
        &self,
        survivors: Vec<RvolSurvivor>,
        momentum_by_symbol: &HashMap<String, f64>,
        regime_threshold: f64,
        scoring_cfg: &Config,
    ) -> Vec<Candidate> {
        let cache = FeatureCache::global();
        let generous_window = Duration::from_secs(7 * 86_400);

        survivors
            .into_iter()
            .filter_map(|survivor| {
                let momentum_score = momentum_by_symbol.get(&survivor.symbol).copied().unwrap_or(0.0);
                let (pattern_match, pattern_bonus) = pattern_matcher::best_match(
                    survivor.rvol,
                    survivor.snapshot.price,
                    survivor.snapshot.change_pct,
                );
                let enrichment = EnrichmentInputs {
                    catalyst_score: cache
                        .read("catalyst_score", &survivor.symbol, generous_window)
                        .map(|e| e.value),
                    short_interest: cache
                        .read("short_interest", &survivor.symbol, generous_window)
                        .map(|e| e.value),
                    float_shares: cache
                        .read("float_shares", &survivor.symbol, generous_window)
                        .map(|e| e.value),
                    borrow_rate: cache
                        .read("borrow_rate", &survivor.symbol, generous_window)
                        .map(|e| e.value),
                };

                let input = ScorerInput {
                    price: survivor.snapshot.price,
                    change_pct: survivor.snapshot.change_pct,
                    rvol: survivor.rvol,
                    momentum_score,
                    pattern_match,
                    pattern_bonus,
                    enrichment,
                };
                let out = scorer::score(&input, scoring_cfg);
                if out.explosion_probability < regime_threshold {
                    return None;
                }

                Some(Candidate {
                    symbol: survivor.symbol,
                    price: survivor.snapshot.price,
                    volume: survivor.snapshot.volume,
                    change_pct: survivor.snapshot.change_pct,
                    rvol: survivor.rvol,
                    momentum_score,
                    pattern_match,
                    base_probability: out.base_probability,
                    explosion_probability: out.explosion_probability,
                    action_tag: out.action_tag,
                    volume_spike_detail: None,
                })
            })
            .collect()
    }
}

fn as_feature(entry: crate::feature_cache::CacheEntry) -> Feature<f64> {
    Feature {
        value: entry.value,
        source: entry.source,
        age_seconds: entry.write_time.elapsed().as_secs_f64(),
        confidence: entry.confidence,
    }
}

fn symbol_history_from_bars(bars: &[crate::types::HistoricalBar]) -> SymbolHistory {
    if bars.is_empty() {
        return SymbolHistory::default();
    }
    let last = bars.last().unwrap().c;
    let change_5d = bars
        .len()
        .checked_sub(6)
        .map(|i| bars[i].c)
        .filter(|&c| c > 0.0)
        .map(|c| (last - c) / c * 100.0);
    let change_20d = bars
        .first()
        .map(|b| b.c)
        .filter(|&c| c > 0.0)
        .map(|c| (last - c) / c * 100.0);
    SymbolHistory {
        change_5d,
        change_20d,
    }
}

fn check_deadline(deadline: Instant) -> EngineResult<()> {
    if Instant::now() > deadline {
        Err(EngineError::Timeout("global run deadline exceeded".into()))
    } else {
        Ok(())
    }
}
