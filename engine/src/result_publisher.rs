//! Writes candidates, trace, and status under strategy-scoped keys with
//! identical TTLs (spec.md §4.13), reusing the teacher's `RedisPool`
//! SETEX-style helper. Key shape follows `original_source`'s
//! `lib/redis_client.py::publish_discovery_contenders`.

use chrono::Utc;
use serde::Serialize;

use crate::error::EngineResult;
use crate::redis_pool::RedisPool;
use crate::types::{RunResult, StageTrace};

#[derive(Debug, Serialize)]
struct ExplainPayload<'a> {
    trace: &'a StageTrace,
    count: usize,
    ts: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct StatusPayload<'a> {
    count: usize,
    ts: chrono::DateTime<Utc>,
    strategy: &'a str,
}

pub struct ResultPublisher {
    redis: RedisPool,
    ttl_secs: usize,
}

impl ResultPublisher {
    pub fn new(redis: RedisPool, ttl_secs: usize) -> Self {
        Self { redis, ttl_secs }
    }

    /// Writes all three keys. Last-writer-wins; readers always observe a
    /// coherent triple because each key is written before the prior
    /// set's TTL expires under normal run cadence.
    pub async fn publish(&self, result: &RunResult) -> EngineResult<()> {
        let strategy = &result.strategy;

        let contenders_key = format!("discovery/contenders/latest/{strategy}");
        self.redis
            .set_json(contenders_key, &result.candidates, self.ttl_secs)
            .await?;

        let explain_key = format!("discovery/explain/latest/{strategy}");
        let explain = ExplainPayload {
            trace: &result.trace,
            count: result.candidates.len(),
            ts: result.timestamp,
        };
        self.redis
            .set_json(explain_key, &explain, self.ttl_secs)
            .await?;

        let status = StatusPayload {
            count: result.candidates.len(),
            ts: result.timestamp,
            strategy,
        };
        self.redis
            .set_json("discovery/status", &status, self.ttl_secs)
            .await?;

        log::info!(
            "published run result: strategy={strategy} candidates={} reason={:?}",
            result.candidates.len(),
            result.stats.reason
        );
        Ok(())
    }
}
