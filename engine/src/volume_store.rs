//! Durable 20-day average-volume store (spec.md §4.2), backed by
//! Postgres through `sqlx`, matching the teacher's `sqlx::query_as!`
//! style in `db/queries.rs`. `avg20d > 0` is enforced at insert time —
//! a symbol with no positive average is simply not written, and callers
//! see it as absent rather than zero.

use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::error::EngineResult;
use crate::types::VolumeAverage;

pub struct VolumeAverageStore {
    pool: PgPool,
}

impl VolumeAverageStore {
    pub async fn connect(database_url: &str) -> EngineResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> EngineResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS volume_averages (
                symbol TEXT PRIMARY KEY,
                avg20d DOUBLE PRECISION NOT NULL,
                last_updated TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Looks up the cached average for each requested symbol, but only
    /// for rows whose `last_updated` is within `max_age`: a stale average
    /// is indistinguishable from a missing one to the caller, matching
    /// spec.md §4.2's staleness policy (default: reject older than 7
    /// days).
    pub async fn get(
        &self,
        symbols: &[String],
        max_age: chrono::Duration,
    ) -> EngineResult<HashMap<String, f64>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let cutoff = Utc::now() - max_age;
        let rows: Vec<VolumeAverage> = sqlx::query_as(
            "SELECT symbol, avg20d, last_updated FROM volume_averages \
             WHERE symbol = ANY($1) AND last_updated >= $2",
        )
        .bind(symbols)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.symbol, r.avg20d)).collect())
    }

    /// Upserts a batch inside one transaction. Entries with `avg20d <= 0`
    /// are dropped before the write — never stored as a degenerate zero
    /// that a downstream division could misread as "no average".
    pub async fn upsert_batch(&self, averages: &HashMap<String, f64>) -> EngineResult<usize> {
        let valid: Vec<(&String, f64)> = averages
            .iter()
            .filter(|(_, &v)| v > 0.0)
            .map(|(k, &v)| (k, v))
            .collect();

        if valid.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        for (symbol, avg20d) in &valid {
            sqlx::query(
                r#"
                INSERT INTO volume_averages (symbol, avg20d, last_updated)
                VALUES ($1, $2, $3)
                ON CONFLICT (symbol) DO UPDATE
                SET avg20d = EXCLUDED.avg20d, last_updated = EXCLUDED.last_updated
                "#,
            )
            .bind(symbol.as_str())
            .bind(avg20d)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        log::info!("upserted {} volume averages", valid.len());
        Ok(valid.len())
    }

    /// Symbols whose cached average is older than `max_age_hours`, for
    /// `refresh-volume-cache --mode stale`.
    pub async fn stale_symbols(&self, max_age_hours: i64) -> EngineResult<Vec<String>> {
        let cutoff = Utc::now() - chrono::Duration::hours(max_age_hours);
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT symbol FROM volume_averages WHERE last_updated < $1")
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(s,)| s).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_or_negative_averages_never_survive_filtering() {
        let mut averages = HashMap::new();
        averages.insert("AAA".to_string(), 0.0);
        averages.insert("BBB".to_string(), -5.0);
        averages.insert("CCC".to_string(), 100.0);
        let valid: Vec<_> = averages.iter().filter(|(_, &v)| v > 0.0).collect();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].0, "CCC");
    }
}
