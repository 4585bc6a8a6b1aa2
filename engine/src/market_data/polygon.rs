//! Polygon.io-shaped REST client (spec.md §6): one bulk snapshot call,
//! one historical-bars call per symbol, and two single-symbol
//! convenience calls. Bounded timeouts, zero retries, never fabricates.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{MarketDataClient, Timespan};
use crate::types::{HistoricalBar, Snapshot};

const BASE_URL: &str = "https://api.polygon.io";
const BULK_TIMEOUT: Duration = Duration::from_secs(30);
const PER_SYMBOL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PolygonMarketDataClient {
    client: reqwest::Client,
    api_key: String,
    dropped_missing_fields: std::sync::atomic::AtomicUsize,
}

impl PolygonMarketDataClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            dropped_missing_fields: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// How many snapshot rows were dropped for missing required fields
    /// on the most recent `bulk_snapshot` call. Exported for observability
    /// per spec.md §4.1.
    pub fn dropped_missing_fields(&self) -> usize {
        self.dropped_missing_fields
            .load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[derive(Debug, Deserialize)]
struct BulkSnapshotResponse {
    tickers: Option<Vec<TickerRow>>,
}

#[derive(Debug, Deserialize)]
struct TickerRow {
    ticker: String,
    day: Option<DayAgg>,
    #[serde(rename = "prevDay")]
    prev_day: Option<DayAgg>,
    #[serde(rename = "todaysChangePerc")]
    todays_change_perc: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DayAgg {
    c: Option<f64>,
    v: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    o: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AggsResponse {
    results: Option<Vec<AggBar>>,
}

#[derive(Debug, Deserialize)]
struct AggBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

fn bar_from_agg(b: &AggBar) -> HistoricalBar {
    HistoricalBar {
        t: Utc.timestamp_millis_opt(b.t).single().unwrap_or_else(Utc::now),
        o: b.o,
        h: b.h,
        l: b.l,
        c: b.c,
        v: b.v,
    }
}

#[async_trait]
impl MarketDataClient for PolygonMarketDataClient {
    async fn bulk_snapshot(&self) -> HashMap<String, Snapshot> {
        let url = format!("{BASE_URL}/v2/snapshot/locale/us/markets/stocks/tickers");
        let resp = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .timeout(BULK_TIMEOUT)
            .send()
            .await;

        let resp = match resp {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                log::error!("bulk snapshot non-success status: {}", r.status());
                return HashMap::new();
            }
            Err(e) => {
                log::error!("bulk snapshot request failed: {e}");
                return HashMap::new();
            }
        };

        let parsed: BulkSnapshotResponse = match resp.json().await {
            Ok(p) => p,
            Err(e) => {
                log::error!("bulk snapshot malformed payload: {e}");
                return HashMap::new();
            }
        };

        let mut out = HashMap::new();
        let mut dropped = 0usize;
        for row in parsed.tickers.unwrap_or_default() {
            let day = match row.day {
                Some(d) => d,
                None => {
                    dropped += 1;
                    continue;
                }
            };
            let (price, volume) = match (day.c, day.v) {
                (Some(p), Some(v)) if p > 0.0 && v >= 0.0 => (p, v),
                _ => {
                    dropped += 1;
                    continue;
                }
            };
            let prev = row.prev_day.unwrap_or(DayAgg {
                c: None,
                v: None,
                h: None,
                l: None,
                o: None,
            });
            out.insert(
                row.ticker,
                Snapshot {
                    price,
                    volume,
                    change_pct: row.todays_change_perc.unwrap_or(0.0),
                    high: day.h.unwrap_or(price),
                    low: day.l.unwrap_or(price),
                    prev_close: prev.c.unwrap_or(price),
                    as_of: Utc::now(),
                },
            );
        }
        self.dropped_missing_fields
            .store(dropped, std::sync::atomic::Ordering::Relaxed);
        out
    }

    async fn historical_bars(
        &self,
        symbol: &str,
        timespan: Timespan,
        limit: usize,
    ) -> Option<Vec<HistoricalBar>> {
        let span = match timespan {
            Timespan::Day => "day",
            Timespan::Minute => "minute",
        };
        let to = Utc::now();
        let from = to - chrono::Duration::days(limit as i64 + 10);
        let url = format!(
            "{BASE_URL}/v2/aggs/ticker/{}/range/1/{span}/{}/{}",
            symbol.to_uppercase(),
            from.timestamp_millis(),
            to.timestamp_millis()
        );

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("adjusted", "true".to_string()),
                ("sort", "asc".to_string()),
                ("limit", (limit + 5).to_string()),
                ("apiKey", self.api_key.clone()),
            ])
            .timeout(PER_SYMBOL_TIMEOUT)
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }
        let parsed: AggsResponse = resp.json().await.ok()?;
        let results = parsed.results?;
        if results.is_empty() {
            return None;
        }
        Some(results.iter().map(bar_from_agg).collect())
    }

    async fn prev_day(&self, symbol: &str) -> Option<Snapshot> {
        let url = format!("{BASE_URL}/v2/aggs/ticker/{}/prev", symbol.to_uppercase());
        let resp = self
            .client
            .get(&url)
            .query(&[("adjusted", "true"), ("apiKey", self.api_key.as_str())])
            .timeout(PER_SYMBOL_TIMEOUT)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let parsed: AggsResponse = resp.json().await.ok()?;
        let bar = parsed.results?.into_iter().next()?;
        Some(Snapshot {
            price: bar.c,
            volume: bar.v,
            change_pct: 0.0,
            high: bar.h,
            low: bar.l,
            prev_close: bar.c,
            as_of: bar_timestamp(bar.t),
        })
    }

    async fn last_minute(&self, symbol: &str) -> Option<Snapshot> {
        let bars = self.historical_bars(symbol, Timespan::Minute, 1).await?;
        let bar = bars.last()?;
        Some(Snapshot {
            price: bar.c,
            volume: bar.v,
            change_pct: 0.0,
            high: bar.h,
            low: bar.l,
            prev_close: bar.c,
            as_of: bar.t,
        })
    }
}

fn bar_timestamp(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_else(Utc::now)
}
