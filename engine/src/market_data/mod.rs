//! One-shot bulk market snapshot, historical bars, and per-symbol
//! fetches. No retry loops live here — callers decide whether to retry
//! (spec.md §4.1).

mod polygon;
mod stream;

pub use polygon::PolygonMarketDataClient;
pub use stream::StreamQuoteListener;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::types::{HistoricalBar, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timespan {
    Day,
    Minute,
}

/// The market-data collaborator boundary (spec.md §6). Exactly one real
/// implementation exists ([`PolygonMarketDataClient`]); tests provide a
/// second, in-memory one.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Exactly one remote call for the full US equities snapshot. Never
    /// fabricates entries: on any failure or malformed payload, returns
    /// an empty map.
    async fn bulk_snapshot(&self) -> HashMap<String, Snapshot>;

    /// Ascending by time; `None` on failure.
    async fn historical_bars(
        &self,
        symbol: &str,
        timespan: Timespan,
        limit: usize,
    ) -> Option<Vec<HistoricalBar>>;

    async fn prev_day(&self, symbol: &str) -> Option<Snapshot>;

    async fn last_minute(&self, symbol: &str) -> Option<Snapshot>;
}
