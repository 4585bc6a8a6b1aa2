//! Process-wide TTL cache of freshness-stamped features (spec.md §4.3).
//!
//! A `DashMap` keyed by `(feature_name, symbol)`, mirroring the teacher's
//! `once_cell::Lazy<DashMap<..>>` singleton task registry in
//! `services/scheduler.rs` (there it tracked abort handles; here it
//! tracks cache entries). Reads are TTL-checked at read time; there is no
//! background eviction task, matching spec.md's "no eviction beyond TTL
//! expiry".

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::time::{Duration, Instant};

use crate::types::Source;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: f64,
    pub write_time: Instant,
    pub source: Source,
    pub confidence: f64,
}

pub struct FeatureCache {
    entries: DashMap<(String, String), CacheEntry>,
}

static INSTANCE: OnceCell<FeatureCache> = OnceCell::new();

impl FeatureCache {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Process-wide singleton: initialized on first use, drained at
    /// shutdown is a caller responsibility (there's no `Drop` hook that
    /// could run before the process exits anyway).
    pub fn global() -> &'static FeatureCache {
        INSTANCE.get_or_init(FeatureCache::new)
    }

    pub fn write(&self, feature: &str, symbol: &str, value: f64, source: Source) {
        let confidence = match source {
            Source::Stream => 1.0_f64.min(1.3),
            _ => 1.0,
        };
        self.entries.insert(
            (feature.to_string(), symbol.to_string()),
            CacheEntry {
                value,
                write_time: Instant::now(),
                source,
                confidence,
            },
        );
    }

    /// Returns the value only if it is within `ttl`, else a miss —
    /// writes always overwrite unconditionally, reads never mutate.
    pub fn read(&self, feature: &str, symbol: &str, ttl: Duration) -> Option<CacheEntry> {
        let key = (feature.to_string(), symbol.to_string());
        let entry = self.entries.get(&key)?;
        if entry.write_time.elapsed() <= ttl {
            Some(entry.clone())
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn fresh_for_test() -> FeatureCache {
        FeatureCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn read_after_write_within_ttl_hits() {
        let cache = FeatureCache::fresh_for_test();
        cache.write("quote", "AAPL", 150.0, Source::Rest);
        let hit = cache.read("quote", "AAPL", Duration::from_secs(5));
        assert_eq!(hit.unwrap().value, 150.0);
    }

    #[test]
    fn read_past_ttl_misses() {
        let cache = FeatureCache::fresh_for_test();
        cache.write("quote", "AAPL", 150.0, Source::Rest);
        sleep(Duration::from_millis(20));
        let hit = cache.read("quote", "AAPL", Duration::from_millis(1));
        assert!(hit.is_none());
    }

    #[test]
    fn stream_source_gets_confidence_boost_capped_at_one() {
        let cache = FeatureCache::fresh_for_test();
        cache.write("quote", "AAPL", 150.0, Source::Stream);
        let hit = cache.read("quote", "AAPL", Duration::from_secs(5)).unwrap();
        assert_eq!(hit.confidence, 1.0);
    }

    #[test]
    fn write_overwrites_unconditionally() {
        let cache = FeatureCache::fresh_for_test();
        cache.write("quote", "AAPL", 150.0, Source::Rest);
        cache.write("quote", "AAPL", 151.0, Source::Rest);
        let hit = cache.read("quote", "AAPL", Duration::from_secs(5)).unwrap();
        assert_eq!(hit.value, 151.0);
    }

    #[test]
    fn distinct_symbols_do_not_collide() {
        let cache = FeatureCache::fresh_for_test();
        cache.write("quote", "AAPL", 150.0, Source::Rest);
        cache.write("quote", "MSFT", 300.0, Source::Rest);
        assert_eq!(cache.len(), 2);
    }
}
