//! Error kinds from spec.md §7. These are behavioral discriminants, not a
//! grab-bag of `anyhow::Error` — callers match on them to decide whether a
//! failure is per-symbol-recoverable or fatal-for-run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("upstream market data unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("insufficient history for {symbol}: {reason}")]
    InsufficientHistory { symbol: String, reason: String },

    #[error("freshness gate tripped: {stale} of {total} symbols stale (> {threshold} threshold)")]
    StaleData {
        stale: usize,
        total: usize,
        threshold: f64,
    },

    #[error("volume average store returned nothing")]
    CacheEmpty,

    #[error("job lock held by another runner for key {0}")]
    LockHeld(String),

    #[error("call exceeded its deadline: {0}")]
    Timeout(String),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
