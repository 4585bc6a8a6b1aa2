//! Offline companion job (spec.md §4.14), ported from
//! `original_source/backend/src/jobs/refresh_volume_cache.py`: computes
//! real 20-day average volume per symbol from historical bars and
//! upserts into [`crate::volume_store::VolumeAverageStore`] in batches,
//! with an inter-batch delay to stay polite to the upstream API.

use std::sync::Arc;
use std::time::Duration;

use crate::error::EngineResult;
use crate::market_data::{MarketDataClient, Timespan};
use crate::volume_store::VolumeAverageStore;

const MIN_BARS_REQUIRED: usize = 10;

pub struct CacheRefreshJob {
    market_data: Arc<dyn MarketDataClient>,
    store: VolumeAverageStore,
}

#[derive(Debug, Default)]
pub struct RefreshReport {
    pub attempted: usize,
    pub upserted: usize,
    pub skipped_insufficient_history: usize,
}

impl CacheRefreshJob {
    pub fn new(market_data: Arc<dyn MarketDataClient>, store: VolumeAverageStore) -> Self {
        Self { market_data, store }
    }

    /// Refreshes every symbol in the current bulk snapshot universe.
    pub async fn refresh_all(
        &self,
        batch_size: usize,
        rate_limit_delay: Duration,
    ) -> EngineResult<RefreshReport> {
        let snapshot = self.market_data.bulk_snapshot().await;
        let symbols: Vec<String> = snapshot.into_keys().collect();
        self.refresh_symbols(&symbols, batch_size, rate_limit_delay).await
    }

    /// Refreshes only the first `limit` symbols from the current
    /// snapshot universe — the `--mode test` dry-run CLI path.
    pub async fn refresh_sample(
        &self,
        limit: usize,
        batch_size: usize,
        rate_limit_delay: Duration,
    ) -> EngineResult<RefreshReport> {
        let snapshot = self.market_data.bulk_snapshot().await;
        let symbols: Vec<String> = snapshot.into_keys().take(limit).collect();
        self.refresh_symbols(&symbols, batch_size, rate_limit_delay).await
    }

    /// Refreshes only symbols whose cached average is older than
    /// `max_age_hours` — the `--mode stale` CLI path.
    pub async fn refresh_stale(
        &self,
        max_age_hours: i64,
        batch_size: usize,
        rate_limit_delay: Duration,
    ) -> EngineResult<RefreshReport> {
        let symbols = self.store.stale_symbols(max_age_hours).await?;
        self.refresh_symbols(&symbols, batch_size, rate_limit_delay).await
    }

    async fn refresh_symbols(
        &self,
        symbols: &[String],
        batch_size: usize,
        rate_limit_delay: Duration,
    ) -> EngineResult<RefreshReport> {
        let mut report = RefreshReport::default();

        for chunk in symbols.chunks(batch_size.max(1)) {
            let mut batch = std::collections::HashMap::new();
            for symbol in chunk {
                report.attempted += 1;
                match self.compute_average(symbol).await {
                    Some(avg) => {
                        batch.insert(symbol.clone(), avg);
                    }
                    None => {
                        report.skipped_insufficient_history += 1;
                        log::debug!("skipping {symbol}: insufficient history for 20-day average");
                    }
                }
            }
            report.upserted += self.store.upsert_batch(&batch).await?;

            if !rate_limit_delay.is_zero() {
                tokio::time::sleep(rate_limit_delay).await;
            }
        }

        log::info!(
            "cache refresh: attempted={} upserted={} skipped={}",
            report.attempted,
            report.upserted,
            report.skipped_insufficient_history
        );
        Ok(report)
    }

    /// Real volumes only — never fabricates a value when history is
    /// thin, and zero-volume bars (holidays, halts) are skipped rather
    /// than dragging the average toward zero (spec.md §4.14).
    async fn compute_average(&self, symbol: &str) -> Option<f64> {
        let bars = self
            .market_data
            .historical_bars(symbol, Timespan::Day, 20)
            .await?;
        let recent = &bars[bars.len().saturating_sub(20)..];
        let volumes: Vec<f64> = recent.iter().map(|b| b.v).filter(|&v| v > 0.0).collect();
        if volumes.len() < MIN_BARS_REQUIRED {
            return None;
        }
        let avg = volumes.iter().sum::<f64>() / volumes.len() as f64;
        if avg > 0.0 {
            Some(avg)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HistoricalBar;
    use chrono::Utc;

    #[test]
    fn min_bars_threshold_is_positive() {
        assert!(MIN_BARS_REQUIRED > 0);
    }

    fn bar(v: f64) -> HistoricalBar {
        HistoricalBar {
            t: Utc::now(),
            o: 1.0,
            h: 1.0,
            l: 1.0,
            c: 1.0,
            v,
        }
    }

    #[test]
    fn zero_volume_bars_are_excluded_from_the_average() {
        let mut bars = vec![bar(1_000.0); 15];
        bars.extend(vec![bar(0.0); 5]);
        let recent = &bars[bars.len().saturating_sub(20)..];
        let volumes: Vec<f64> = recent.iter().map(|b| b.v).filter(|&v| v > 0.0).collect();
        assert_eq!(volumes.len(), 15);
        let avg = volumes.iter().sum::<f64>() / volumes.len() as f64;
        assert_eq!(avg, 1_000.0);
    }
}
